//! `gripworks-hal` – driver seams for everything the mechanics touch.
//!
//! # Modules
//!
//! - [`hinge`] – [`Hinge`][hinge::Hinge]: the rotating attachment of a lever
//!   mechanism (read its Euler angles, snap it back to an angle).
//! - [`haptics`] – [`HapticDevice`][haptics::HapticDevice] drivers and the
//!   [`HapticSink`][haptics::HapticSink] seam levers fire intents into.
//! - [`body`] – [`LocomotionBody`][body::LocomotionBody]: the character body
//!   climbing displaces.
//! - [`registry`] – [`ControllerRegistry`][registry::ControllerRegistry]:
//!   explicitly owned table of recognized hands, the body each belongs to, and
//!   its haptic device.
//! - [`sim`] – in-process drivers that record every command, for tests and the
//!   replay CLI.

pub mod body;
pub mod haptics;
pub mod hinge;
pub mod registry;
pub mod sim;

pub use body::LocomotionBody;
pub use haptics::{HapticDevice, HapticSink};
pub use hinge::Hinge;
pub use registry::ControllerRegistry;
