//! `gripworks-types` – shared vocabulary for the whole workspace.
//!
//! Identifiers, the event envelope published on the middleware bus, haptic
//! intents, the static configuration structs, and the workspace-wide
//! [`GripError`].

pub mod config;

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use config::{
    CheckMode, ClimberConfig, CombinationConfig, HandConfig, LeverConfig, MountAxis,
    NotchConfig, RequirementConfig, SceneConfig, Tuning,
};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a constrained lever, e.g. `"vault_lever_a"`.
    LeverId
);
string_id!(
    /// A hand or other gripping actor. Hands double as pose frames, so the id
    /// is also the frame name looked up in the pose source.
    ActorId
);
string_id!(
    /// A locomotion body (the player rig a climbing hand belongs to).
    BodyId
);

/// How strongly and for how long a haptic pulse should fire.
///
/// Rendering the pulse is the hardware driver's job; the mechanics only decide
/// when to fire and with what parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HapticIntent {
    /// Normalized strength in `[0, 1]`.
    pub strength: f32,
    /// Pulse length in seconds.
    pub duration_s: f32,
}

impl HapticIntent {
    /// Build an intent, clamping `strength` to `[0, 1]` and `duration_s` to
    /// be non-negative. Non-finite inputs collapse to zero.
    pub fn new(strength: f32, duration_s: f32) -> Self {
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        let duration_s = if duration_s.is_finite() { duration_s.max(0.0) } else { 0.0 };
        Self { strength, duration_s }
    }
}

/// Envelope for everything published on the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"gripworks-runtime::scene"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Everything the mechanics layer reports to out-of-scope collaborators
/// (audio, UI, doors, particle effects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    LeverChanged {
        lever: LeverId,
        new_value: f32,
        old_value: f32,
        notch: Option<usize>,
    },
    NotchCrossed {
        lever: LeverId,
        notch: usize,
    },
    CombinationSatisfied {
        combination: String,
    },
    CombinationUnsatisfied {
        combination: String,
    },
    ClimbStarted {
        body: BodyId,
        hand: ActorId,
    },
    ClimbEnded {
        body: BodyId,
        hand: ActorId,
    },
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GripError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Unknown lever: {0}")]
    UnknownLever(String),

    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    #[error("Unknown pose frame: {0}")]
    UnknownFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Listener on {signal} failed: {details}")]
    Listener { signal: String, details: String },

    #[error("Re-entrant notification into {0}")]
    Reentrant(String),

    #[error("Event channel error: {0}")]
    Channel(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_and_compare() {
        let a = LeverId::from("lever_a");
        assert_eq!(a.to_string(), "lever_a");
        assert_eq!(a, LeverId::new(String::from("lever_a")));
        assert_eq!(ActorId::from("left_hand").as_str(), "left_hand");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&BodyId::from("player")).unwrap();
        assert_eq!(json, "\"player\"");
    }

    #[test]
    fn haptic_intent_clamps() {
        let h = HapticIntent::new(3.0, -1.0);
        assert_eq!(h.strength, 1.0);
        assert_eq!(h.duration_s, 0.0);

        let nan = HapticIntent::new(f32::NAN, f32::INFINITY);
        assert_eq!(nan.strength, 0.0);
        assert_eq!(nan.duration_s, 0.0);
    }

    #[test]
    fn event_payload_is_tagged() {
        let event = Event::new(
            "gripworks-runtime::scene",
            EventPayload::NotchCrossed {
                lever: LeverId::from("dial"),
                notch: 2,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"notch_crossed\""));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.payload, event.payload);
    }

    #[test]
    fn grip_error_display() {
        let err = GripError::HardwareFault {
            component: "vault_hinge".to_string(),
            details: "joint locked".to_string(),
        };
        assert!(err.to_string().contains("vault_hinge"));
        assert!(GripError::UnknownLever("x".into()).to_string().contains("Unknown lever"));
    }
}
