//! `gripworks-mechanics` – physical puzzle mechanics.
//!
//! Everything here runs synchronously inside a frame: a lever change reaches
//! the combinations listening to it before [`ConstrainedLever::on_frame`]
//! returns.
//!
//! # Modules
//!
//! - [`range`] – angle normalization and the angle ↔ value mapping of a
//!   lever's travel.
//! - [`notch`] – [`NotchGrid`][notch::NotchGrid]: evenly spaced detents over
//!   the `[0, 1]` value.
//! - [`lever`] – [`ConstrainedLever`][lever::ConstrainedLever]: hinge-driven
//!   lever with change thresholding, notch feedback, exclusive engagement
//!   and idle drift correction.
//! - [`combination`] – [`CombinationEvaluator`][combination::CombinationEvaluator]:
//!   multi-lever lock that reports satisfied / unsatisfied edges.
//! - [`climb`] – [`ClimbLocomotion`][climb::ClimbLocomotion]: moves a body
//!   opposite to the gripping hand.

pub mod climb;
pub mod combination;
pub mod lever;
pub mod notch;
pub mod range;

pub use climb::ClimbLocomotion;
pub use combination::{CombinationEvaluator, Edge, Requirement};
pub use lever::{ConstrainedLever, LeverChange, LeverProbe, LeverReading, LeverSnapshot, NotchCrossing};
pub use notch::NotchGrid;
pub use range::{AngleRange, normalize_angle};
