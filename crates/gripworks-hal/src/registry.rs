//! [`ControllerRegistry`] – explicitly owned table of recognized hands.
//!
//! Every hand that may grip a lever or climb is registered here together with
//! the locomotion body it belongs to and, optionally, its haptic device. The
//! registry is constructed by the scene and handed to whoever needs to
//! enumerate hands, so there is no process-wide controller list.
//!
//! Haptic intents addressed to a hand are forwarded to that hand's device.
//! A hand without a device swallows the intent: firing feedback at an actor
//! that cannot render it is a no-op, not an error.

use std::collections::BTreeMap;

use gripworks_types::{ActorId, BodyId, GripError, HapticIntent};
use tracing::{debug, warn};

use crate::haptics::{HapticDevice, HapticSink};

struct HandEntry {
    body: Option<BodyId>,
    haptics: Option<Box<dyn HapticDevice>>,
}

/// Recognized hands, the body each belongs to, and their haptic devices.
#[derive(Default)]
pub struct ControllerRegistry {
    hands: BTreeMap<ActorId, HandEntry>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hand` as a recognized gripping actor owned by `body`.
    /// Re-registering replaces the previous entry, dropping its device.
    pub fn register_hand(&mut self, hand: ActorId, body: Option<BodyId>) {
        debug!(hand = %hand, body = ?body, "hand registered");
        self.hands.insert(hand, HandEntry { body, haptics: None });
    }

    /// Attach a haptic device to the hand named by `device.id()`.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::UnknownActor`] when that hand is not registered.
    pub fn attach_haptics(&mut self, device: Box<dyn HapticDevice>) -> Result<(), GripError> {
        let hand = ActorId::from(device.id());
        match self.hands.get_mut(&hand) {
            Some(entry) => {
                entry.haptics = Some(device);
                Ok(())
            }
            None => Err(GripError::UnknownActor(hand.0)),
        }
    }

    /// Forget `hand`. Returns whether it was registered.
    pub fn unregister_hand(&mut self, hand: &ActorId) -> bool {
        self.hands.remove(hand).is_some()
    }

    /// Whether `hand` is a recognized hand.
    pub fn is_recognized(&self, hand: &ActorId) -> bool {
        self.hands.contains_key(hand)
    }

    /// The body `hand` belongs to, if it is recognized and owned.
    pub fn body_of(&self, hand: &ActorId) -> Option<&BodyId> {
        self.hands.get(hand).and_then(|entry| entry.body.as_ref())
    }

    /// Every recognized hand, in id order.
    pub fn active_hands(&self) -> impl Iterator<Item = &ActorId> {
        self.hands.keys()
    }

    /// Hands owned by `body`, in id order.
    pub fn hands_of<'a>(&'a self, body: &'a BodyId) -> impl Iterator<Item = &'a ActorId> + 'a {
        self.hands
            .iter()
            .filter(move |(_, entry)| entry.body.as_ref() == Some(body))
            .map(|(hand, _)| hand)
    }

    pub fn has_haptics(&self, hand: &ActorId) -> bool {
        self.hands.get(hand).is_some_and(|entry| entry.haptics.is_some())
    }
}

impl HapticSink for ControllerRegistry {
    fn send(&mut self, actor: &ActorId, intent: HapticIntent) -> Result<(), GripError> {
        let Some(entry) = self.hands.get_mut(actor) else {
            warn!(actor = %actor, "haptic intent for unregistered actor dropped");
            return Ok(());
        };
        match entry.haptics.as_mut() {
            Some(device) => device.pulse(intent),
            None => {
                debug!(actor = %actor, "actor has no haptic device; intent ignored");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimHaptics;

    #[test]
    fn registered_hand_is_recognized_and_owned() {
        let mut registry = ControllerRegistry::new();
        registry.register_hand("left_hand".into(), Some("player".into()));
        registry.register_hand("prop_hand".into(), None);

        assert!(registry.is_recognized(&"left_hand".into()));
        assert!(!registry.is_recognized(&"tentacle".into()));
        assert_eq!(registry.body_of(&"left_hand".into()), Some(&BodyId::from("player")));
        assert_eq!(registry.body_of(&"prop_hand".into()), None);
    }

    #[test]
    fn send_routes_to_attached_device() {
        let mut registry = ControllerRegistry::new();
        registry.register_hand("right_hand".into(), Some("player".into()));
        let (device, log) = SimHaptics::new("right_hand");
        registry.attach_haptics(device).unwrap();

        registry
            .send(&"right_hand".into(), HapticIntent::new(0.3, 0.1))
            .unwrap();

        let pulses = log.borrow();
        assert_eq!(pulses.len(), 1);
        assert!((pulses[0].strength - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn send_without_device_is_noop() {
        let mut registry = ControllerRegistry::new();
        registry.register_hand("left_hand".into(), None);
        assert!(registry.send(&"left_hand".into(), HapticIntent::new(0.5, 0.1)).is_ok());
        assert!(registry.send(&"ghost".into(), HapticIntent::new(0.5, 0.1)).is_ok());
        assert!(!registry.has_haptics(&"left_hand".into()));
    }

    #[test]
    fn attach_haptics_to_unknown_hand_fails() {
        let mut registry = ControllerRegistry::new();
        let (device, _log) = SimHaptics::new("ghost");
        let err = registry.attach_haptics(device).unwrap_err();
        assert!(matches!(err, GripError::UnknownActor(ref id) if id == "ghost"));
    }

    #[test]
    fn hands_of_filters_by_body() {
        let mut registry = ControllerRegistry::new();
        registry.register_hand("a_left".into(), Some("alice".into()));
        registry.register_hand("a_right".into(), Some("alice".into()));
        registry.register_hand("b_left".into(), Some("bob".into()));

        let alice = BodyId::from("alice");
        let hands: Vec<_> = registry.hands_of(&alice).map(|h| h.as_str().to_string()).collect();
        assert_eq!(hands, vec!["a_left", "a_right"]);
        assert_eq!(registry.active_hands().count(), 3);

        assert!(registry.unregister_hand(&"b_left".into()));
        assert_eq!(registry.active_hands().count(), 2);
    }
}
