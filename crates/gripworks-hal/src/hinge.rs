//! `Hinge` trait for the rotating attachment of a lever mechanism.
//!
//! The physics layer owns the joint; the lever only reads its orientation
//! every frame and, while idle, occasionally writes it back to undo solver
//! drift.

use gripworks_perception::Vec3;
use gripworks_types::GripError;

/// A rotating mechanism attachment (hinge joint, dial, wall lever).
pub trait Hinge {
    /// Stable identifier, normally the id of the lever it drives.
    fn id(&self) -> &str;

    /// Current Euler angles in degrees, one component per axis. Any range is
    /// accepted (physics engines often report `[0, 360)`); readers normalize.
    fn euler_deg(&self) -> Vec3;

    /// Rotate the mechanism to `euler` (degrees).
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] if the joint refuses the pose.
    fn set_euler_deg(&mut self, euler: Vec3) -> Result<(), GripError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedHinge {
        euler: Vec3,
        locked: bool,
    }

    impl Hinge for FixedHinge {
        fn id(&self) -> &str {
            "fixed"
        }

        fn euler_deg(&self) -> Vec3 {
            self.euler
        }

        fn set_euler_deg(&mut self, euler: Vec3) -> Result<(), GripError> {
            if self.locked {
                return Err(GripError::HardwareFault {
                    component: self.id().to_string(),
                    details: "joint locked".to_string(),
                });
            }
            self.euler = euler;
            Ok(())
        }
    }

    #[test]
    fn set_and_read_euler() {
        let mut hinge = FixedHinge { euler: Vec3::ZERO, locked: false };
        hinge.set_euler_deg(Vec3::new(30.0, 0.0, 0.0)).unwrap();
        assert!((hinge.euler_deg().x - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn locked_hinge_reports_fault() {
        let mut hinge = FixedHinge { euler: Vec3::ZERO, locked: true };
        let err = hinge.set_euler_deg(Vec3::new(10.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, GripError::HardwareFault { .. }));
        assert_eq!(hinge.euler_deg(), Vec3::ZERO);
    }
}
