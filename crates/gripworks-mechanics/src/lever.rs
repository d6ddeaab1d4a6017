//! [`ConstrainedLever`] – a hinge-mounted lever with a normalized value.
//!
//! The lever reads its hinge every frame, maps the raw angle on its mount
//! axis to a value in `[0, 1]`, and publishes meaningful changes to its
//! listeners before the frame returns.
//!
//! # Per-frame behaviour
//!
//! | Step | Condition | Effect |
//! |---|---|---|
//! | Map | always | raw angle → normalized, clamped candidate value |
//! | Commit | change above threshold, or reaching 0 / 1 | value updated, notch recomputed, listeners notified |
//! | Notch pulse | new notch reached while engaged | short pulse to the engaging hand |
//! | Continuous pulse | engaged | `vibration_strength` for the frame's duration |
//! | Drift correction | idle and hinge off the value's angle | hinge snapped back to the value |
//!
//! Only one actor can engage a lever at a time; a second actor's grab is
//! refused until the first lets go.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use gripworks_hal::{HapticSink, Hinge};
use gripworks_middleware::{Signal, Subscription};
use gripworks_types::{ActorId, GripError, HapticIntent, LeverConfig, LeverId, MountAxis, Tuning};
use tracing::{debug, info, trace, warn};

use crate::notch::NotchGrid;
use crate::range::{AngleRange, axis_angle, normalize_angle, with_axis_angle};

// ────────────────────────────────────────────────────────────────────────────
// Readings and notifications
// ────────────────────────────────────────────────────────────────────────────

/// The observable state of a lever at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeverReading {
    pub value: f32,
    /// Notch the value sits at; `None` between notches or with notches off.
    pub notch: Option<usize>,
    pub notches_enabled: bool,
}

/// Delivered to value-changed listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct LeverChange {
    pub lever: LeverId,
    pub new_value: f32,
    pub old_value: f32,
    pub notch: Option<usize>,
    pub notches_enabled: bool,
}

impl LeverChange {
    pub fn reading(&self) -> LeverReading {
        LeverReading {
            value: self.new_value,
            notch: self.notch,
            notches_enabled: self.notches_enabled,
        }
    }
}

/// Delivered to notch listeners when the value arrives at a new notch.
#[derive(Debug, Clone, PartialEq)]
pub struct NotchCrossing {
    pub lever: LeverId,
    pub previous: Option<usize>,
    pub notch: usize,
}

/// Read-only handle on a lever's latest reading.
///
/// Holds the lever weakly: once the lever is dropped, [`LeverProbe::read`]
/// returns `None`.
#[derive(Debug, Clone)]
pub struct LeverProbe {
    lever: LeverId,
    reading: Weak<Cell<LeverReading>>,
}

impl LeverProbe {
    pub fn lever(&self) -> &LeverId {
        &self.lever
    }

    pub fn read(&self) -> Option<LeverReading> {
        self.reading.upgrade().map(|cell| cell.get())
    }

    pub fn is_alive(&self) -> bool {
        self.reading.strong_count() > 0
    }
}

/// Everything a debug view needs to draw a lever.
#[derive(Debug, Clone, PartialEq)]
pub struct LeverSnapshot {
    pub id: LeverId,
    pub range: AngleRange,
    pub mount_axis: MountAxis,
    pub value: f32,
    pub target_angle_deg: f32,
    pub notch: Option<usize>,
    /// Value of every notch, empty when notches are off.
    pub notch_values: Vec<f32>,
    pub engaged_by: Option<ActorId>,
    pub interactable: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// ConstrainedLever
// ────────────────────────────────────────────────────────────────────────────

pub struct ConstrainedLever {
    id: LeverId,
    range: AngleRange,
    axis: MountAxis,
    notches: Option<NotchGrid>,
    vibration_strength: f32,
    tuning: Tuning,
    interactable: bool,
    value: f32,
    notch: Option<usize>,
    engaged_by: Option<ActorId>,
    published: Rc<Cell<LeverReading>>,
    value_changed: Signal<LeverChange>,
    notch_crossed: Signal<NotchCrossing>,
    retired: Signal<LeverId>,
}

impl std::fmt::Debug for ConstrainedLever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstrainedLever")
            .field("id", &self.id)
            .field("value", &self.value)
            .field("notch", &self.notch)
            .field("engaged_by", &self.engaged_by)
            .finish_non_exhaustive()
    }
}

impl ConstrainedLever {
    /// Build a lever from its configuration. The initial value comes from
    /// `config.initial_value`; call [`activate`](Self::activate) to pose the
    /// hinge to match it.
    pub fn new(config: &LeverConfig, tuning: &Tuning) -> Self {
        let config = config.clone().validated();
        let range = AngleRange::new(config.min_deg, config.max_deg);
        if range.is_degenerate() {
            warn!(lever = %config.id, angle = config.min_deg, "lever range is degenerate; value pinned to 0");
        }
        let notches = NotchGrid::from_config(config.id.as_str(), &config.notches);
        let value = config.initial_value;
        let notch = notches.as_ref().and_then(|grid| grid.current_index(value));
        let reading = LeverReading {
            value,
            notch,
            notches_enabled: notches.is_some(),
        };
        let name = config.id.as_str();
        Self {
            value_changed: Signal::new(&format!("{name}.value_changed")),
            notch_crossed: Signal::new(&format!("{name}.notch_crossed")),
            retired: Signal::new(&format!("{name}.retired")),
            id: config.id,
            range,
            axis: config.mount_axis,
            notches,
            vibration_strength: config.vibration_strength,
            tuning: tuning.clone().validated(),
            interactable: config.interactable,
            value,
            notch,
            engaged_by: None,
            published: Rc::new(Cell::new(reading)),
        }
    }

    pub fn id(&self) -> &LeverId {
        &self.id
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Notch the value currently sits at (`None` is "no notch").
    pub fn current_notch_index(&self) -> Option<usize> {
        self.notch
    }

    pub fn notches(&self) -> Option<&NotchGrid> {
        self.notches.as_ref()
    }

    pub fn range(&self) -> AngleRange {
        self.range
    }

    pub fn mount_axis(&self) -> MountAxis {
        self.axis
    }

    pub fn engaged_by(&self) -> Option<&ActorId> {
        self.engaged_by.as_ref()
    }

    pub fn is_interactable(&self) -> bool {
        self.interactable
    }

    /// A non-interactable lever ignores its hinge and refuses grabs. Turning
    /// interaction off also releases any current engagement.
    pub fn set_interactable(&mut self, interactable: bool) {
        if !interactable && let Some(actor) = self.engaged_by.take() {
            debug!(lever = %self.id, actor = %actor, "engagement dropped; lever made non-interactable");
        }
        self.interactable = interactable;
    }

    pub fn reading(&self) -> LeverReading {
        self.published.get()
    }

    pub fn probe(&self) -> LeverProbe {
        LeverProbe {
            lever: self.id.clone(),
            reading: Rc::downgrade(&self.published),
        }
    }

    pub fn angle_to_value(&self, raw_angle_deg: f32) -> f32 {
        self.range.angle_to_value(raw_angle_deg)
    }

    pub fn value_to_angle(&self) -> f32 {
        self.range.value_to_angle(self.value)
    }

    pub fn is_at_notch(&self, index: usize) -> bool {
        self.notches
            .as_ref()
            .is_some_and(|grid| grid.is_at_notch(self.value, index))
    }

    /// Nearest notch to the current value, ignoring the snap tolerance.
    pub fn closest_notch(&self) -> Option<usize> {
        self.notches.as_ref().map(|grid| grid.closest_notch(self.value))
    }

    /// Value of notch `index`, or `None` when notches are off.
    pub fn notch_value(&self, index: usize) -> Option<f32> {
        self.notches.as_ref().map(|grid| grid.notch_value(index))
    }

    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn on_value_changed<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&LeverChange) -> Result<(), GripError> + 'static,
    {
        self.value_changed.subscribe(listener)
    }

    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn on_notch_crossed<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&NotchCrossing) -> Result<(), GripError> + 'static,
    {
        self.notch_crossed.subscribe(listener)
    }

    /// Fires once with the lever's id when the lever is dropped.
    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn on_retired<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&LeverId) -> Result<(), GripError> + 'static,
    {
        self.retired.subscribe(listener)
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────

    /// Pose `hinge` to the angle of the current value.
    pub fn activate(&mut self, hinge: &mut dyn Hinge) -> Result<(), GripError> {
        let euler = with_axis_angle(self.axis, hinge.euler_deg(), self.value_to_angle());
        hinge.set_euler_deg(euler)?;
        info!(lever = %self.id, value = self.value, hinge = hinge.id(), "lever activated");
        Ok(())
    }

    /// Per-frame update: read `hinge`, track the value, fire haptics and, when
    /// nobody holds the lever, pull the hinge back onto the value's angle.
    pub fn on_frame(
        &mut self,
        hinge: &mut dyn Hinge,
        haptics: &mut dyn HapticSink,
        dt: f32,
    ) -> Result<Option<LeverChange>, GripError> {
        if !self.interactable {
            return Ok(None);
        }
        let raw = axis_angle(self.axis, hinge.euler_deg());
        let change = self.apply_raw_angle(raw, haptics, dt);
        self.correct_drift(hinge)?;
        Ok(change)
    }

    /// Track a raw hinge angle without touching the hinge.
    ///
    /// Returns the committed change, if any. Non-finite angles are ignored.
    pub fn apply_raw_angle(
        &mut self,
        raw_angle_deg: f32,
        haptics: &mut dyn HapticSink,
        dt: f32,
    ) -> Option<LeverChange> {
        let change = if raw_angle_deg.is_finite() {
            let candidate = self.range.angle_to_value(raw_angle_deg);
            if self.should_propagate(candidate) {
                Some(self.commit(candidate, haptics))
            } else {
                None
            }
        } else {
            warn!(lever = %self.id, raw_angle_deg, "non-finite hinge angle ignored");
            None
        };

        if let Some(actor) = self.engaged_by.clone() {
            let intent = HapticIntent::new(self.vibration_strength, dt.max(0.0));
            self.send_haptics(haptics, &actor, intent);
        }
        change
    }

    /// Set the value directly, as a puzzle reset or scripted sequence would.
    ///
    /// The value is clamped to `[0, 1]`; changes at or below the change
    /// threshold are ignored. When idle the hinge is snapped to the new value.
    pub fn set_value(
        &mut self,
        value: f32,
        hinge: &mut dyn Hinge,
        haptics: &mut dyn HapticSink,
    ) -> Result<Option<LeverChange>, GripError> {
        if !value.is_finite() {
            return Err(GripError::InvalidConfig(format!(
                "lever {} cannot take non-finite value {value}",
                self.id
            )));
        }
        let value = value.clamp(0.0, 1.0);
        if (value - self.value).abs() <= self.tuning.change_threshold {
            return Ok(None);
        }
        let change = self.commit(value, haptics);
        self.correct_drift(hinge)?;
        Ok(Some(change))
    }

    // ── Engagement ─────────────────────────────────────────────────────────

    /// Try to grab the lever. Returns `true` when `actor` now holds it.
    ///
    /// A lever that is already held stays with its current holder.
    pub fn begin_engagement(&mut self, actor: &ActorId) -> bool {
        if !self.interactable {
            debug!(lever = %self.id, actor = %actor, "grab refused; lever not interactable");
            return false;
        }
        match &self.engaged_by {
            Some(holder) if holder == actor => true,
            Some(holder) => {
                debug!(lever = %self.id, actor = %actor, holder = %holder, "grab refused; lever already held");
                false
            }
            None => {
                self.engaged_by = Some(actor.clone());
                debug!(lever = %self.id, actor = %actor, "lever engaged");
                true
            }
        }
    }

    /// Let go. Returns `true` when `actor` was the holder; other actors
    /// cannot release someone else's grab.
    pub fn end_engagement(&mut self, actor: &ActorId) -> bool {
        if self.engaged_by.as_ref() == Some(actor) {
            self.engaged_by = None;
            debug!(lever = %self.id, actor = %actor, "lever released");
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> LeverSnapshot {
        let notch_values = self
            .notches
            .as_ref()
            .map(|grid| (0..grid.count()).map(|i| grid.notch_value(i)).collect())
            .unwrap_or_default();
        LeverSnapshot {
            id: self.id.clone(),
            range: self.range,
            mount_axis: self.axis,
            value: self.value,
            target_angle_deg: self.value_to_angle(),
            notch: self.notch,
            notch_values,
            engaged_by: self.engaged_by.clone(),
            interactable: self.interactable,
        }
    }

    // ── Internals ──────────────────────────────────────────────────────────

    /// Above-threshold changes always propagate. Smaller changes still
    /// propagate when the candidate sits at either end of the travel, so a
    /// slow push can always reach exactly 0 or 1.
    fn should_propagate(&self, candidate: f32) -> bool {
        let delta = (candidate - self.value).abs();
        let epsilon = self.tuning.change_threshold;
        if delta > epsilon {
            return true;
        }
        delta > 0.0 && (candidate <= epsilon || candidate >= 1.0 - epsilon)
    }

    fn commit(&mut self, new_value: f32, haptics: &mut dyn HapticSink) -> LeverChange {
        let old_value = self.value;
        self.value = new_value;

        let next_notch = self.notches.as_ref().and_then(|grid| grid.current_index(new_value));
        let crossing = if next_notch != self.notch {
            let previous = self.notch;
            self.notch = next_notch;
            next_notch.map(|notch| NotchCrossing {
                lever: self.id.clone(),
                previous,
                notch,
            })
        } else {
            None
        };

        self.published.set(LeverReading {
            value: new_value,
            notch: self.notch,
            notches_enabled: self.notches.is_some(),
        });

        if let Some(crossing) = crossing {
            trace!(lever = %self.id, notch = crossing.notch, "notch reached");
            if let (Some(actor), Some(grid)) = (self.engaged_by.clone(), self.notches.as_ref()) {
                let intent = HapticIntent::new(grid.feedback_strength(), self.tuning.notch_pulse_duration_s);
                self.send_haptics(haptics, &actor, intent);
            }
            self.notch_crossed.emit(&crossing);
        }

        let change = LeverChange {
            lever: self.id.clone(),
            new_value,
            old_value,
            notch: self.notch,
            notches_enabled: self.notches.is_some(),
        };
        trace!(lever = %self.id, old_value, new_value, "lever value changed");
        let delivery = self.value_changed.emit(&change);
        if delivery.failed > 0 {
            debug!(lever = %self.id, failed = delivery.failed, "some value listeners failed");
        }
        change
    }

    /// Snap the hinge back onto the current value when nobody holds the
    /// lever and the hinge has drifted past the correction tolerance.
    /// Returns whether the hinge was written.
    fn correct_drift(&self, hinge: &mut dyn Hinge) -> Result<bool, GripError> {
        if self.engaged_by.is_some() {
            return Ok(false);
        }
        let euler = hinge.euler_deg();
        let current = normalize_angle(axis_angle(self.axis, euler));
        let target = self.value_to_angle();
        if current.is_finite() && (target - current).abs() <= self.tuning.angle_correction_tolerance_deg {
            return Ok(false);
        }
        hinge.set_euler_deg(with_axis_angle(self.axis, euler, target))?;
        trace!(lever = %self.id, from = current, to = target, "hinge drift corrected");
        Ok(true)
    }

    fn send_haptics(&self, haptics: &mut dyn HapticSink, actor: &ActorId, intent: HapticIntent) {
        if let Err(error) = haptics.send(actor, intent) {
            warn!(lever = %self.id, actor = %actor, %error, "haptic pulse failed");
        }
    }
}

impl Drop for ConstrainedLever {
    fn drop(&mut self) {
        debug!(lever = %self.id, "lever retired");
        self.retired.emit(&self.id);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
