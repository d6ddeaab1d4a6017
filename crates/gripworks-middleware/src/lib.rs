//! `gripworks-middleware` – notification plumbing.
//!
//! # Modules
//!
//! - [`signal`] – [`Signal`][signal::Signal]: synchronous, fault-contained
//!   multicast used inside the frame (lever → combination), with RAII
//!   [`Subscription`][signal::Subscription] guards.
//! - [`bus`] – [`EventBus`][bus::EventBus]: topic-based broadcast feed built on
//!   Tokio broadcast channels for collaborators outside the frame loop.

pub mod bus;
pub mod signal;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use signal::{Delivery, Signal, Subscription};
