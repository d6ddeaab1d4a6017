//! In-process simulation drivers for tests and trace replay.
//!
//! Each driver records the commands it receives and reports plausible state
//! back, so the whole mechanics stack runs headless.
//!
//! # Example
//!
//! ```rust
//! use gripworks_hal::sim::SimControllers;
//! use gripworks_hal::HapticSink;
//! use gripworks_types::HapticIntent;
//!
//! let (mut registry, logs) = SimControllers::new()
//!     .with_hand("left_hand", Some("player"))
//!     .build();
//!
//! registry.send(&"left_hand".into(), HapticIntent::new(0.3, 0.1)).unwrap();
//! assert_eq!(logs["left_hand"].borrow().len(), 1);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gripworks_perception::Vec3;
use gripworks_types::{ActorId, BodyId, GripError, HapticIntent};

use crate::body::LocomotionBody;
use crate::haptics::HapticDevice;
use crate::hinge::Hinge;
use crate::registry::ControllerRegistry;

/// Shared view of the pulses a [`SimHaptics`] device has rendered.
pub type PulseLog = Rc<RefCell<Vec<HapticIntent>>>;

// ────────────────────────────────────────────────────────────────────────────
// Hinge
// ────────────────────────────────────────────────────────────────────────────

/// A simulated hinge that stores its Euler angles and counts writes.
#[derive(Debug, Clone)]
pub struct SimHinge {
    id: String,
    euler: Vec3,
    writes: usize,
}

impl SimHinge {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            euler: Vec3::ZERO,
            writes: 0,
        }
    }

    /// Simulate the physics layer moving the joint (not counted as a write).
    pub fn drive(&mut self, euler: Vec3) {
        self.euler = euler;
    }

    /// Number of times the mechanics wrote the joint's pose.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Hinge for SimHinge {
    fn id(&self) -> &str {
        &self.id
    }

    fn euler_deg(&self) -> Vec3 {
        self.euler
    }

    fn set_euler_deg(&mut self, euler: Vec3) -> Result<(), GripError> {
        self.euler = euler;
        self.writes += 1;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Haptics
// ────────────────────────────────────────────────────────────────────────────

/// A simulated haptic motor that appends every pulse to a shared log.
pub struct SimHaptics {
    id: String,
    log: PulseLog,
}

impl SimHaptics {
    /// Create a device for `hand`, returning it with a handle to its log.
    pub fn new(hand: impl Into<String>) -> (Box<Self>, PulseLog) {
        let log = PulseLog::default();
        let device = Box::new(Self {
            id: hand.into(),
            log: Rc::clone(&log),
        });
        (device, log)
    }
}

impl HapticDevice for SimHaptics {
    fn id(&self) -> &str {
        &self.id
    }

    fn pulse(&mut self, intent: HapticIntent) -> Result<(), GripError> {
        self.log.borrow_mut().push(intent);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Body
// ────────────────────────────────────────────────────────────────────────────

/// A simulated character body that integrates every move it is given.
#[derive(Debug, Clone)]
pub struct SimBody {
    id: String,
    position: Vec3,
    moves: Vec<Vec3>,
}

impl SimBody {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            moves: Vec::new(),
        }
    }

    /// Every displacement applied so far, oldest first.
    pub fn moves(&self) -> &[Vec3] {
        &self.moves
    }
}

impl LocomotionBody for SimBody {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn move_by(&mut self, delta: Vec3) -> Result<(), GripError> {
        self.position += delta;
        self.moves.push(delta);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimControllers builder
// ────────────────────────────────────────────────────────────────────────────

/// Builds a [`ControllerRegistry`] whose hands all carry [`SimHaptics`]
/// devices, returning the registry with the pulse log of every hand.
#[derive(Default)]
pub struct SimControllers {
    hands: Vec<(ActorId, Option<BodyId>)>,
}

impl SimControllers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hand(mut self, hand: &str, body: Option<&str>) -> Self {
        self.hands.push((ActorId::from(hand), body.map(BodyId::from)));
        self
    }

    pub fn build(self) -> (ControllerRegistry, HashMap<String, PulseLog>) {
        let mut registry = ControllerRegistry::new();
        let mut logs = HashMap::new();
        for (hand, body) in self.hands {
            let (device, log) = SimHaptics::new(hand.as_str());
            registry.register_hand(hand.clone(), body);
            if registry.attach_haptics(device).is_ok() {
                logs.insert(hand.0, log);
            }
        }
        (registry, logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::HapticSink;

    #[test]
    fn sim_hinge_counts_writes_not_drives() {
        let mut hinge = SimHinge::new("dial");
        hinge.drive(Vec3::new(12.0, 0.0, 0.0));
        assert_eq!(hinge.writes(), 0);
        hinge.set_euler_deg(Vec3::new(5.0, 0.0, 0.0)).unwrap();
        assert_eq!(hinge.writes(), 1);
        assert!((hinge.euler_deg().x - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sim_body_integrates_moves() {
        let mut body = SimBody::new("player", Vec3::new(0.0, 1.0, 0.0));
        body.move_by(Vec3::new(0.0, 0.5, 0.0)).unwrap();
        body.move_by(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(body.position().approx_eq(Vec3::new(1.0, 1.5, 0.0), 1e-6));
        assert_eq!(body.moves().len(), 2);
    }

    #[test]
    fn builder_wires_every_hand() {
        let (mut registry, logs) = SimControllers::new()
            .with_hand("left_hand", Some("player"))
            .with_hand("right_hand", Some("player"))
            .build();

        assert_eq!(logs.len(), 2);
        registry.send(&"right_hand".into(), HapticIntent::new(1.0, 0.1)).unwrap();
        assert!(logs["left_hand"].borrow().is_empty());
        assert_eq!(logs["right_hand"].borrow().len(), 1);
    }
}
