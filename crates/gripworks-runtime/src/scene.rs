//! [`Scene`] – owns every mechanism of a puzzle scene and steps them per
//! frame.
//!
//! # Frame order
//!
//! 1. Levers, in configuration order. Each lever reads its hinge, commits
//!    its value and notifies listeners (combinations included) before the
//!    next lever runs.
//! 2. Climbers, which move their body and update the body's frame in the
//!    pose graph.
//!
//! Interaction events ([`InteractionEvent`]) are applied between frames via
//! [`Scene::handle`].
//!
//! # Drivers
//!
//! [`SceneBuilder`] accepts real hinges, haptic devices and bodies. Anything
//! not supplied falls back to the simulation drivers in
//! [`gripworks_hal::sim`], so a scene file alone is enough to run headless.

use std::collections::HashMap;

use gripworks_hal::sim::{SimBody, SimHaptics, SimHinge};
use gripworks_hal::{ControllerRegistry, HapticDevice, Hinge, LocomotionBody};
use gripworks_mechanics::{ClimbLocomotion, CombinationEvaluator, ConstrainedLever, LeverChange};
use gripworks_middleware::{EventBus, Subscription, Topic};
use gripworks_perception::{PoseGraph, Vec3, WORLD};
use gripworks_types::{
    ActorId, BodyId, Event, EventPayload, GripError, LeverId, SceneConfig, Tuning,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::debug_view::LeverGizmo;

const EVENT_SOURCE: &str = "gripworks-runtime::scene";

// ────────────────────────────────────────────────────────────────────────────
// Interaction events
// ────────────────────────────────────────────────────────────────────────────

/// Something a hand did between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionEvent {
    /// A hand grabbed a lever.
    Engage { lever: LeverId, hand: ActorId },
    /// A hand let go of a lever.
    Disengage { lever: LeverId, hand: ActorId },
    /// A hand entered a climbable region.
    RegionEnter { hand: ActorId },
    /// A hand left a climbable region.
    RegionExit { hand: ActorId },
    /// Tracking lost a hand: every grip it holds is released.
    HandLost { hand: ActorId },
    /// Scripted value change (puzzle reset, cut-scene).
    SetValue { lever: LeverId, value: f32 },
    SetInteractable { lever: LeverId, interactable: bool },
}

/// What happened during one [`Scene::step`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub changes: Vec<LeverChange>,
    /// Non-zero body displacements applied by climbing.
    pub displacements: Vec<(BodyId, Vec3)>,
    /// Driver faults, one per failing lever or body. Other mechanisms still
    /// ran this frame.
    pub faults: Vec<GripError>,
}

// ────────────────────────────────────────────────────────────────────────────
// SceneBuilder
// ────────────────────────────────────────────────────────────────────────────

/// Assembles a [`Scene`] from a [`SceneConfig`] and optional real drivers.
pub struct SceneBuilder {
    config: SceneConfig,
    hinges: HashMap<LeverId, Box<dyn Hinge>>,
    haptics: Vec<Box<dyn HapticDevice>>,
    bodies: HashMap<BodyId, Box<dyn LocomotionBody>>,
    bus: Option<EventBus>,
}

impl SceneBuilder {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            hinges: HashMap::new(),
            haptics: Vec::new(),
            bodies: HashMap::new(),
            bus: None,
        }
    }

    /// Use `hinge` for `lever` instead of a [`SimHinge`].
    pub fn with_hinge(mut self, lever: impl Into<LeverId>, hinge: Box<dyn Hinge>) -> Self {
        self.hinges.insert(lever.into(), hinge);
        self
    }

    /// Attach `device` to the hand named by its id.
    pub fn with_haptics(mut self, device: Box<dyn HapticDevice>) -> Self {
        self.haptics.push(device);
        self
    }

    /// Use `body` for the climber whose body id matches `body.id()`.
    pub fn with_body(mut self, body: Box<dyn LocomotionBody>) -> Self {
        self.bodies.insert(BodyId::from(body.id()), body);
        self
    }

    /// Forward lever, puzzle and locomotion events onto `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Build the scene: register hands, activate levers, attach combinations.
    ///
    /// # Errors
    ///
    /// - [`GripError::InvalidConfig`] for duplicate lever or climber ids.
    /// - [`GripError::UnknownActor`] for a haptic device whose hand is not
    ///   configured.
    /// - Any driver error raised while posing hinges at activation.
    pub fn build(self) -> Result<Scene, GripError> {
        let SceneBuilder {
            config,
            mut hinges,
            haptics,
            mut bodies,
            bus,
        } = self;
        let config = config.validated();

        // ── Controllers ────────────────────────────────────────────────────
        let mut controllers = ControllerRegistry::new();
        for hand in &config.hands {
            controllers.register_hand(hand.id.clone(), hand.body.clone());
        }
        let mut supplied = Vec::new();
        for device in haptics {
            supplied.push(ActorId::from(device.id()));
            controllers.attach_haptics(device)?;
        }
        for hand in config.hands.iter().filter(|h| h.haptics && !supplied.contains(&h.id)) {
            let (device, _log) = SimHaptics::new(hand.id.as_str());
            controllers.attach_haptics(device)?;
        }

        // ── Levers ─────────────────────────────────────────────────────────
        let mut levers: Vec<LeverSlot> = Vec::with_capacity(config.levers.len());
        for lever_config in &config.levers {
            if levers.iter().any(|slot| slot.lever.id() == &lever_config.id) {
                return Err(GripError::InvalidConfig(format!(
                    "duplicate lever id {}",
                    lever_config.id
                )));
            }
            let mut hinge = hinges
                .remove(&lever_config.id)
                .unwrap_or_else(|| Box::new(SimHinge::new(lever_config.id.as_str())));
            let mut lever = ConstrainedLever::new(lever_config, &config.tuning);
            lever.activate(hinge.as_mut())?;
            levers.push(LeverSlot { lever, hinge });
        }
        for orphan in hinges.keys() {
            warn!(lever = %orphan, "hinge supplied for a lever that is not in the scene");
        }

        // ── Event feed. Must exist before combinations attach.
        let mut combinations: Vec<CombinationEvaluator> =
            config.combinations.iter().map(CombinationEvaluator::new).collect();
        let mut feed = Vec::new();
        if let Some(bus) = &bus {
            for slot in &levers {
                feed.extend(forward_lever(bus, &slot.lever));
            }
            for combination in &combinations {
                feed.extend(forward_combination(bus, combination));
            }
        }
        for combination in &mut combinations {
            combination.attach(levers.iter().map(|slot| &slot.lever));
        }

        // ── Climbers ───────────────────────────────────────────────────────
        let mut poses = PoseGraph::new();
        let mut climbers: Vec<ClimbLocomotion> = Vec::with_capacity(config.climbers.len());
        for climber in &config.climbers {
            if climbers.iter().any(|c| c.body_id() == &climber.body) {
                return Err(GripError::InvalidConfig(format!(
                    "duplicate climber for body {}",
                    climber.body
                )));
            }
            let body = bodies.remove(&climber.body).unwrap_or_else(|| {
                Box::new(SimBody::new(
                    climber.body.as_str(),
                    Vec3::from_array(climber.start_position),
                ))
            });
            poses.set_translation(WORLD, climber.body.as_str(), body.position());
            climbers.push(ClimbLocomotion::new(body, climber.reference_frame.clone()));
        }

        info!(
            levers = levers.len(),
            combinations = combinations.len(),
            climbers = climbers.len(),
            hands = config.hands.len(),
            "scene built"
        );

        Ok(Scene {
            tuning: config.tuning,
            poses,
            controllers,
            levers,
            combinations,
            climbers,
            bus,
            _feed: feed,
            frame: 0,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scene
// ────────────────────────────────────────────────────────────────────────────

struct LeverSlot {
    lever: ConstrainedLever,
    hinge: Box<dyn Hinge>,
}

pub struct Scene {
    tuning: Tuning,
    poses: PoseGraph,
    controllers: ControllerRegistry,
    levers: Vec<LeverSlot>,
    combinations: Vec<CombinationEvaluator>,
    climbers: Vec<ClimbLocomotion>,
    bus: Option<EventBus>,
    _feed: Vec<Subscription>,
    frame: u64,
}

impl Scene {
    /// Build a scene from `config` with simulation drivers throughout.
    pub fn build(config: SceneConfig) -> Result<Self, GripError> {
        SceneBuilder::new(config).build()
    }

    pub fn builder(config: SceneConfig) -> SceneBuilder {
        SceneBuilder::new(config)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Advance one frame of `dt` seconds.
    pub fn step(&mut self, dt: f32) -> FrameReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        for slot in &mut self.levers {
            match slot.lever.on_frame(slot.hinge.as_mut(), &mut self.controllers, dt) {
                Ok(Some(change)) => report.changes.push(change),
                Ok(None) => {}
                Err(error) => {
                    warn!(lever = %slot.lever.id(), %error, "lever frame failed");
                    report.faults.push(error);
                }
            }
        }

        for climber in &mut self.climbers {
            match climber.on_frame(&self.poses) {
                Ok(moved) => {
                    if moved != Vec3::ZERO {
                        report.displacements.push((climber.body_id().clone(), moved));
                    }
                }
                Err(error) => {
                    warn!(body = %climber.body_id(), %error, "climb frame failed");
                    report.faults.push(error);
                }
            }
            self.poses
                .set_translation(WORLD, climber.body_id().as_str(), climber.body().position());
        }

        report
    }

    /// Apply an interaction event. Returns whether it changed anything.
    ///
    /// Events from hands that are not registered are ignored.
    ///
    /// # Errors
    ///
    /// [`GripError::UnknownLever`] when the event names a lever that is not in
    /// the scene, or a driver error from a scripted value change.
    pub fn handle(&mut self, event: &InteractionEvent) -> Result<bool, GripError> {
        match event {
            InteractionEvent::Engage { lever, hand } => {
                if !self.recognized(hand) {
                    return Ok(false);
                }
                Ok(self.slot_mut(lever)?.lever.begin_engagement(hand))
            }
            InteractionEvent::Disengage { lever, hand } => {
                Ok(self.slot_mut(lever)?.lever.end_engagement(hand))
            }
            InteractionEvent::RegionEnter { hand } => {
                if !self.recognized(hand) {
                    return Ok(false);
                }
                let Some(body) = self.controllers.body_of(hand).cloned() else {
                    debug!(hand = %hand, "hand belongs to no body; region ignored");
                    return Ok(false);
                };
                let Some(climber) = self.climbers.iter_mut().find(|c| c.body_id() == &body) else {
                    debug!(hand = %hand, body = %body, "body cannot climb; region ignored");
                    return Ok(false);
                };
                let started = climber.on_region_enter(&body, hand, &self.poses);
                if started {
                    self.publish(
                        Topic::Locomotion,
                        EventPayload::ClimbStarted {
                            body,
                            hand: hand.clone(),
                        },
                    );
                }
                Ok(started)
            }
            InteractionEvent::RegionExit { hand } => {
                let Some(body) = self.controllers.body_of(hand).cloned() else {
                    return Ok(false);
                };
                let ended = self
                    .climbers
                    .iter_mut()
                    .find(|c| c.body_id() == &body)
                    .is_some_and(|climber| climber.on_region_exit(&body, hand));
                if ended {
                    self.publish(
                        Topic::Locomotion,
                        EventPayload::ClimbEnded {
                            body,
                            hand: hand.clone(),
                        },
                    );
                }
                Ok(ended)
            }
            InteractionEvent::HandLost { hand } => {
                let mut changed = false;
                for slot in &mut self.levers {
                    changed |= slot.lever.end_engagement(hand);
                }
                let mut ended = Vec::new();
                for climber in &mut self.climbers {
                    if climber.engaged_hand() == Some(hand) && climber.disengage().is_some() {
                        ended.push(climber.body_id().clone());
                    }
                }
                for body in ended {
                    changed = true;
                    self.publish(
                        Topic::Locomotion,
                        EventPayload::ClimbEnded {
                            body,
                            hand: hand.clone(),
                        },
                    );
                }
                if changed {
                    info!(hand = %hand, "hand lost; grips released");
                }
                Ok(changed)
            }
            InteractionEvent::SetValue { lever, value } => {
                let slot = self
                    .levers
                    .iter_mut()
                    .find(|slot| slot.lever.id() == lever)
                    .ok_or_else(|| GripError::UnknownLever(lever.to_string()))?;
                let change =
                    slot.lever
                        .set_value(*value, slot.hinge.as_mut(), &mut self.controllers)?;
                Ok(change.is_some())
            }
            InteractionEvent::SetInteractable { lever, interactable } => {
                let slot = self.slot_mut(lever)?;
                let changed = slot.lever.is_interactable() != *interactable;
                slot.lever.set_interactable(*interactable);
                Ok(changed)
            }
        }
    }

    pub fn poses(&self) -> &PoseGraph {
        &self.poses
    }

    /// Tracking input: write hand and body frames here before each step.
    pub fn poses_mut(&mut self) -> &mut PoseGraph {
        &mut self.poses
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    pub fn controllers_mut(&mut self) -> &mut ControllerRegistry {
        &mut self.controllers
    }

    pub fn lever(&self, id: &LeverId) -> Option<&ConstrainedLever> {
        self.levers
            .iter()
            .find(|slot| slot.lever.id() == id)
            .map(|slot| &slot.lever)
    }

    pub fn levers(&self) -> impl Iterator<Item = &ConstrainedLever> {
        self.levers.iter().map(|slot| &slot.lever)
    }

    /// The hinge driving `lever`; physics input writes its angles here.
    pub fn hinge_mut(&mut self, lever: &LeverId) -> Option<&mut dyn Hinge> {
        let slot = self.levers.iter_mut().find(|slot| slot.lever.id() == lever)?;
        Some(slot.hinge.as_mut())
    }

    pub fn combination(&self, id: &str) -> Option<&CombinationEvaluator> {
        self.combinations.iter().find(|c| c.id() == id)
    }

    pub fn combinations(&self) -> impl Iterator<Item = &CombinationEvaluator> {
        self.combinations.iter()
    }

    pub fn climber(&self, body: &BodyId) -> Option<&ClimbLocomotion> {
        self.climbers.iter().find(|c| c.body_id() == body)
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.bus.as_ref()
    }

    /// One debug gizmo per lever, in configuration order.
    pub fn gizmos(&self) -> Vec<LeverGizmo> {
        self.levers
            .iter()
            .map(|slot| LeverGizmo::capture(&slot.lever, slot.hinge.as_ref()))
            .collect()
    }

    fn recognized(&self, hand: &ActorId) -> bool {
        let known = self.controllers.is_recognized(hand);
        if !known {
            debug!(hand = %hand, "unrecognized hand ignored");
        }
        known
    }

    fn slot_mut(&mut self, lever: &LeverId) -> Result<&mut LeverSlot, GripError> {
        self.levers
            .iter_mut()
            .find(|slot| slot.lever.id() == lever)
            .ok_or_else(|| GripError::UnknownLever(lever.to_string()))
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Some(bus) = &self.bus
            && let Err(error) = bus.publish_to(topic, Event::new(EVENT_SOURCE, payload))
        {
            warn!(%error, "event feed publish failed");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event feed
// ────────────────────────────────────────────────────────────────────────────

fn forward_lever(bus: &EventBus, lever: &ConstrainedLever) -> [Subscription; 2] {
    let values = bus.clone();
    let notches = bus.clone();
    [
        lever.on_value_changed(move |change| {
            let payload = EventPayload::LeverChanged {
                lever: change.lever.clone(),
                new_value: change.new_value,
                old_value: change.old_value,
                notch: change.notch,
            };
            values
                .publish_to(Topic::Mechanisms, Event::new(EVENT_SOURCE, payload))
                .map(|_| ())
        }),
        lever.on_notch_crossed(move |crossing| {
            let payload = EventPayload::NotchCrossed {
                lever: crossing.lever.clone(),
                notch: crossing.notch,
            };
            notches
                .publish_to(Topic::Mechanisms, Event::new(EVENT_SOURCE, payload))
                .map(|_| ())
        }),
    ]
}

fn forward_combination(bus: &EventBus, combination: &CombinationEvaluator) -> [Subscription; 2] {
    let on = bus.clone();
    let off = bus.clone();
    let on_id = combination.id().to_string();
    let off_id = on_id.clone();
    [
        combination.on_satisfied(move |_| {
            let payload = EventPayload::CombinationSatisfied {
                combination: on_id.clone(),
            };
            on.publish_to(Topic::Puzzles, Event::new(EVENT_SOURCE, payload))
                .map(|_| ())
        }),
        combination.on_unsatisfied(move |_| {
            let payload = EventPayload::CombinationUnsatisfied {
                combination: off_id.clone(),
            };
            off.publish_to(Topic::Puzzles, Event::new(EVENT_SOURCE, payload))
                .map(|_| ())
        }),
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
