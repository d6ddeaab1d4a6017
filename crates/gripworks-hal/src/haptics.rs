//! Haptic output seams.
//!
//! [`HapticDevice`] is the driver attached to one hand. [`HapticSink`] is what
//! levers fire intents into; the [`ControllerRegistry`][crate::registry::ControllerRegistry]
//! implements it by routing each intent to the addressed hand's device.

use gripworks_types::{ActorId, GripError, HapticIntent};

/// A vibration motor on a tracked hand controller.
pub trait HapticDevice {
    /// The actor (hand) this device is attached to.
    fn id(&self) -> &str;

    /// Render `intent`.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] if the device rejects the pulse.
    fn pulse(&mut self, intent: HapticIntent) -> Result<(), GripError>;
}

/// Destination for haptic intents addressed to an actor.
pub trait HapticSink {
    /// Deliver `intent` to `actor`. An actor with no haptic device is not an
    /// error.
    fn send(&mut self, actor: &ActorId, intent: HapticIntent) -> Result<(), GripError>;
}

/// Collecting sink, handy when the caller wants to inspect or batch intents.
impl HapticSink for Vec<(ActorId, HapticIntent)> {
    fn send(&mut self, actor: &ActorId, intent: HapticIntent) -> Result<(), GripError> {
        self.push((actor.clone(), intent));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_in_order() {
        let mut sink: Vec<(ActorId, HapticIntent)> = Vec::new();
        sink.send(&ActorId::from("left_hand"), HapticIntent::new(0.2, 0.016)).unwrap();
        sink.send(&ActorId::from("right_hand"), HapticIntent::new(0.3, 0.1)).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].0.as_str(), "left_hand");
        assert!((sink[1].1.strength - 0.3).abs() < f32::EPSILON);
    }
}
