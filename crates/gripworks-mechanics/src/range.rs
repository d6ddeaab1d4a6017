//! Angle normalization and the angle ↔ value mapping of a lever.

use gripworks_perception::Vec3;
use gripworks_types::MountAxis;

/// Wrap `deg` into `(-180, 180]`. Non-finite input is returned unchanged.
pub fn normalize_angle(deg: f32) -> f32 {
    if !deg.is_finite() {
        return deg;
    }
    let wrapped = 180.0 - (180.0 - deg).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative remainders.
    if wrapped <= -180.0 { 180.0 } else { wrapped }
}

/// `t` such that `lerp(a, b, t) == v`, clamped to `[0, 1]`. A degenerate
/// span (`a == b`) maps everything to 0.
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    let span = b - a;
    if span.abs() <= f32::EPSILON {
        return 0.0;
    }
    ((v - a) / span).clamp(0.0, 1.0)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// The component of `euler` that rotates about `axis`.
pub fn axis_angle(axis: MountAxis, euler: Vec3) -> f32 {
    match axis {
        MountAxis::X => euler.x,
        MountAxis::Y => euler.y,
        MountAxis::Z => euler.z,
    }
}

/// `euler` with the `axis` component replaced by `angle`.
pub fn with_axis_angle(axis: MountAxis, euler: Vec3, angle: f32) -> Vec3 {
    match axis {
        MountAxis::X => Vec3::new(angle, euler.y, euler.z),
        MountAxis::Y => Vec3::new(euler.x, angle, euler.z),
        MountAxis::Z => Vec3::new(euler.x, euler.y, angle),
    }
}

/// Angular travel of a lever in degrees. `min` maps to value 0 and `max` to
/// value 1; a reversed range (`min > max`) is allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleRange {
    pub min: f32,
    pub max: f32,
}

impl AngleRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn is_degenerate(&self) -> bool {
        (self.max - self.min).abs() <= f32::EPSILON
    }

    /// Clamp `angle` into the travel, whichever way round it is configured.
    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.min.min(self.max), self.min.max(self.max))
    }

    /// Raw mechanism angle → normalized value. Total over finite input.
    pub fn angle_to_value(&self, raw_deg: f32) -> f32 {
        let angle = self.clamp(normalize_angle(raw_deg));
        inverse_lerp(self.min, self.max, angle)
    }

    /// Normalized value → mechanism angle.
    pub fn value_to_angle(&self, value: f32) -> f32 {
        lerp(self.min, self.max, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_into_half_open_range() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert!((normalize_angle(350.0) - -10.0).abs() < 1e-4);
        assert!((normalize_angle(190.0) - -170.0).abs() < 1e-4);
        assert!((normalize_angle(-190.0) - 170.0).abs() < 1e-4);
        assert!((normalize_angle(725.0) - 5.0).abs() < 1e-3);
        assert!(normalize_angle(-1e-9) > -180.0);
    }

    #[test]
    fn angle_to_value_clamps_out_of_range() {
        let range = AngleRange::new(-45.0, 45.0);
        assert_eq!(range.angle_to_value(-90.0), 0.0);
        assert_eq!(range.angle_to_value(90.0), 1.0);
        assert!((range.angle_to_value(0.0) - 0.5).abs() < 1e-6);
        // 315° as reported by an engine is -45° once normalized.
        assert!(range.angle_to_value(315.0).abs() < 1e-5);
    }

    #[test]
    fn reversed_range_maps_min_to_zero() {
        let range = AngleRange::new(60.0, -30.0);
        assert!(range.angle_to_value(60.0).abs() < 1e-6);
        assert!((range.angle_to_value(-30.0) - 1.0).abs() < 1e-6);
        assert!((range.value_to_angle(1.0) - -30.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_range_is_total() {
        let range = AngleRange::new(10.0, 10.0);
        assert!(range.is_degenerate());
        assert_eq!(range.angle_to_value(10.0), 0.0);
        assert_eq!(range.angle_to_value(-170.0), 0.0);
    }

    #[test]
    fn value_angle_round_trip() {
        let range = AngleRange::new(-60.0, 45.0);
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            let back = range.angle_to_value(range.value_to_angle(v));
            assert!((back - v).abs() < 1e-5, "v={v} back={back}");
        }
    }

    #[test]
    fn axis_helpers_touch_one_component() {
        let euler = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(axis_angle(MountAxis::Y, euler), 2.0);
        assert_eq!(with_axis_angle(MountAxis::Z, euler, 9.0), Vec3::new(1.0, 2.0, 9.0));
        assert_eq!(with_axis_angle(MountAxis::X, euler, 9.0), Vec3::new(9.0, 2.0, 3.0));
    }
}
