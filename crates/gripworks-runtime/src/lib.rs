//! `gripworks-runtime` – scene assembly and the frame loop.
//!
//! # Modules
//!
//! - [`scene`] – [`Scene`][scene::Scene] and [`SceneBuilder`][scene::SceneBuilder]:
//!   own every lever, combination and climber of a scene, apply
//!   [`InteractionEvent`][scene::InteractionEvent]s and step the mechanics
//!   once per frame. Optionally forwards everything onto an
//!   [`EventBus`][gripworks_middleware::EventBus].
//! - [`config`] – TOML scene loading ([`load_from`][config::load_from],
//!   [`from_toml_str`][config::from_toml_str]) and design-time
//!   [`lint`][config::lint] warnings.
//! - [`replay`] – drive a scene from a JSON-lines trace of poses, hinge
//!   angles and interaction events.
//! - [`debug_view`] – [`LeverGizmo`][debug_view::LeverGizmo] snapshots for
//!   overlays.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console or
//!   JSON logging with optional OTLP export.

pub mod config;
pub mod debug_view;
pub mod replay;
pub mod scene;
pub mod telemetry;

pub use config::{ConfigError, ConfigWarning};
pub use debug_view::LeverGizmo;
pub use scene::{FrameReport, InteractionEvent, Scene, SceneBuilder};
pub use telemetry::{TracerProviderGuard, init_tracing};
