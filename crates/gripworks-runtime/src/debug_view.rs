//! Read-only debug snapshots of levers for editor overlays and the CLI.

use gripworks_hal::Hinge;
use gripworks_mechanics::range::axis_angle;
use gripworks_mechanics::{ConstrainedLever, normalize_angle};
use gripworks_types::{ActorId, GripError, LeverId, MountAxis};
use serde::Serialize;

/// Everything needed to draw a lever: its travel arc, notch ticks, where the
/// hinge is and where the value says it should be.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeverGizmo {
    pub lever: LeverId,
    pub axis: MountAxis,
    pub min_deg: f32,
    pub max_deg: f32,
    /// Hinge angle on the mount axis as last read.
    pub current_angle_deg: f32,
    /// Angle implied by the current value.
    pub target_angle_deg: f32,
    pub value: f32,
    pub notch: Option<usize>,
    pub notch_angles_deg: Vec<f32>,
    pub engaged_by: Option<ActorId>,
    pub interactable: bool,
}

impl LeverGizmo {
    pub fn capture(lever: &ConstrainedLever, hinge: &dyn Hinge) -> Self {
        let snapshot = lever.snapshot();
        Self {
            current_angle_deg: normalize_angle(axis_angle(snapshot.mount_axis, hinge.euler_deg())),
            notch_angles_deg: snapshot
                .notch_values
                .iter()
                .map(|v| snapshot.range.value_to_angle(*v))
                .collect(),
            lever: snapshot.id,
            axis: snapshot.mount_axis,
            min_deg: snapshot.range.min,
            max_deg: snapshot.range.max,
            target_angle_deg: snapshot.target_angle_deg,
            value: snapshot.value,
            notch: snapshot.notch,
            engaged_by: snapshot.engaged_by,
            interactable: snapshot.interactable,
        }
    }

    /// Points of the travel arc at `radius`, in the plane the lever swings
    /// in, from `min_deg` to `max_deg` inclusive.
    pub fn arc_points(&self, radius: f32, segments: usize) -> Vec<[f32; 3]> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| {
                let t = i as f32 / segments as f32;
                let angle = (self.min_deg + (self.max_deg - self.min_deg) * t).to_radians();
                let (sin, cos) = angle.sin_cos();
                match self.axis {
                    MountAxis::X => [0.0, radius * cos, radius * sin],
                    MountAxis::Y => [radius * sin, 0.0, radius * cos],
                    MountAxis::Z => [radius * cos, radius * sin, 0.0],
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, GripError> {
        serde_json::to_string(self).map_err(|e| GripError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gripworks_hal::sim::SimHinge;
    use gripworks_perception::Vec3;
    use gripworks_types::{LeverConfig, Tuning};

    fn notched_lever() -> ConstrainedLever {
        ConstrainedLever::new(
            &LeverConfig::new("vault_a", -45.0, 45.0).with_notches(3),
            &Tuning::default(),
        )
    }

    #[test]
    fn capture_reports_notch_angles_and_hinge() {
        let lever = notched_lever();
        let mut hinge = SimHinge::new("vault_a");
        hinge.drive(Vec3::new(350.0, 0.0, 0.0));

        let gizmo = LeverGizmo::capture(&lever, &hinge);
        assert_eq!(gizmo.notch_angles_deg, vec![-45.0, 0.0, 45.0]);
        assert!((gizmo.current_angle_deg - -10.0).abs() < 1e-4);
        assert!((gizmo.target_angle_deg - -45.0).abs() < 1e-6);
        assert_eq!(gizmo.notch, Some(0));
    }

    #[test]
    fn arc_spans_the_travel() {
        let lever = notched_lever();
        let gizmo = LeverGizmo::capture(&lever, &SimHinge::new("vault_a"));
        let arc = gizmo.arc_points(1.0, 4);
        assert_eq!(arc.len(), 5);
        let first = arc[0];
        assert!(first[0].abs() < 1e-6);
        assert!((first[1] - 45f32.to_radians().cos()).abs() < 1e-5);
        assert!((first[2] + 45f32.to_radians().sin()).abs() < 1e-5);
    }

    #[test]
    fn serializes_to_json() {
        let gizmo = LeverGizmo::capture(&notched_lever(), &SimHinge::new("vault_a"));
        let json = gizmo.to_json().unwrap();
        assert!(json.contains("\"lever\":\"vault_a\""));
        assert!(json.contains("\"axis\":\"x\""));
    }
}
