//! Topic-based broadcast feed for out-of-frame collaborators.
//!
//! In-frame propagation (lever → combination) goes through
//! [`Signal`][crate::signal::Signal]. The [`EventBus`] is the outward feed:
//! audio, UI, door animation and recording tools subscribe here and consume
//! at their own pace. Publishing never blocks and never waits for readers.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Mechanisms`] | Lever value changes and notch crossings |
//! | [`Topic::Puzzles`] | Combination satisfied / unsatisfied edges |
//! | [`Topic::Locomotion`] | Climb session start / end |

use gripworks_types::{Event, GripError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (events buffered before slow subscribers lag).
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Mechanisms,
    Puzzles,
    Locomotion,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Mechanisms, Topic::Puzzles, Topic::Locomotion];
}

/// Shared event bus. Clones share the same underlying channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    mechanisms: broadcast::Sender<Event>,
    puzzles: broadcast::Sender<Event>,
    locomotion: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus; `capacity` applies to every topic channel.
    pub fn new(capacity: usize) -> Self {
        let (mechanisms, _) = broadcast::channel(capacity);
        let (puzzles, _) = broadcast::channel(capacity);
        let (locomotion, _) = broadcast::channel(capacity);
        Self {
            mechanisms,
            puzzles,
            locomotion,
        }
    }

    /// Publish `event` on `topic`.
    ///
    /// Returns the number of receivers handed the event; `Ok(0)` when nobody
    /// is listening, which is the normal state of a headless scene.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, GripError> {
        let sender = self.topic_sender(topic);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(event)
            .map_err(|e| GripError::Channel(format!("publish on {topic:?} failed: {e}")))
    }

    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Mechanisms => &self.mechanisms,
            Topic::Puzzles => &self.puzzles,
            Topic::Locomotion => &self.locomotion,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns `Err(Lagged(n))` when `n` events were dropped because this
    /// receiver fell behind, and `Err(Closed)` once the bus is gone.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Drain every event already buffered without waiting. Lag is logged and
    /// skipped over.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "receiver lagged");
                }
                Err(_) => return events,
            }
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gripworks_types::{EventPayload, LeverId};

    fn lever_event(value: f32) -> Event {
        Event::new(
            "gripworks-middleware::test",
            EventPayload::LeverChanged {
                lever: LeverId::from("vault_a"),
                new_value: value,
                old_value: 0.0,
                notch: None,
            },
        )
    }

    #[test]
    fn publish_without_subscribers_is_ok_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.publish_to(Topic::Mechanisms, lever_event(0.5)).unwrap(), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut first = bus.subscribe_to(Topic::Mechanisms);
        let mut second = bus.subscribe_to(Topic::Mechanisms);

        let event = lever_event(0.25);
        assert_eq!(bus.publish_to(Topic::Mechanisms, event.clone())?, 2);

        assert_eq!(first.recv().await?.id, event.id);
        assert_eq!(second.recv().await?.id, event.id);
        Ok(())
    }

    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut puzzles = bus.subscribe_to(Topic::Puzzles);
        let _mechanisms = bus.subscribe_to(Topic::Mechanisms);

        bus.publish_to(Topic::Mechanisms, lever_event(1.0))?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), puzzles.recv()).await;
        assert!(result.is_err(), "puzzle subscriber must not see mechanism events");
        Ok(())
    }

    #[test]
    fn drain_returns_buffered_events_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Mechanisms);
        for v in [0.1, 0.2, 0.3] {
            bus.publish_to(Topic::Mechanisms, lever_event(v)).unwrap();
        }
        let drained = rx.drain();
        assert_eq!(drained.len(), 3);
        assert!(matches!(
            drained[2].payload,
            EventPayload::LeverChanged { new_value, .. } if (new_value - 0.3).abs() < 1e-6
        ));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn drain_skips_over_lag() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe_to(Topic::Locomotion);
        for i in 0..20 {
            bus.publish_to(Topic::Locomotion, lever_event(i as f32)).unwrap();
        }
        let drained = rx.drain();
        assert_eq!(drained.len(), 4);
        assert_eq!(rx.topic(), Topic::Locomotion);
    }
}
