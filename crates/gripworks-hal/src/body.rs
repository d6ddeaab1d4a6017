//! `LocomotionBody` – the character body a climbing hand drags around.
//!
//! Gravity and ground contact belong to the body's own physics integration;
//! climbing only ever asks it to translate.

use gripworks_perception::Vec3;
use gripworks_types::GripError;

pub trait LocomotionBody {
    /// Stable identifier, e.g. `"player"`.
    fn id(&self) -> &str;

    /// Current world position of the body origin.
    fn position(&self) -> Vec3;

    /// Translate the body by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] if the controller cannot move.
    fn move_by(&mut self, delta: Vec3) -> Result<(), GripError>;
}
