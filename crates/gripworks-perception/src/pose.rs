//! Pose graph for hands, bodies and mechanism attachments.
//!
//! Keeps a directed graph of named frames and the rigid transforms
//! (translation + quaternion rotation) relating them. The external tracking
//! layer writes fresh poses every frame; the mechanics read them through the
//! [`SpatialPoseSource`] trait and never care how they were produced.
//!
//! # Example
//!
//! ```rust
//! use gripworks_perception::pose::{PoseGraph, SpatialPoseSource, Vec3, WORLD};
//!
//! let mut poses = PoseGraph::new();
//!
//! // The player rig stands 2 m along +X.
//! poses.set_translation(WORLD, "player", Vec3::new(2.0, 0.0, 0.0));
//! // The left hand is tracked 0.4 m up inside the rig.
//! poses.set_translation("player", "left_hand", Vec3::new(0.0, 0.4, 0.0));
//!
//! let hand = poses.position(WORLD, "left_hand").unwrap();
//! assert!((hand.x - 2.0).abs() < 1e-5);
//! assert!((hand.y - 0.4).abs() < 1e-5);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Name of the root frame every tracked pose ultimately hangs from.
pub const WORLD: &str = "world";

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D point or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Component-wise comparison within `eps`.
    pub fn approx_eq(self, rhs: Self, eps: f32) -> bool {
        (self.x - rhs.x).abs() <= eps && (self.y - rhs.y).abs() <= eps && (self.z - rhs.z).abs() <= eps
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `degrees` about the (not necessarily normalized) `axis`.
    /// A zero axis yields the identity.
    pub fn from_axis_angle_deg(axis: Vec3, degrees: f32) -> Self {
        let len = axis.length();
        if len <= f32::EPSILON {
            return Self::identity();
        }
        let half = degrees.to_radians() * 0.5;
        let s = half.sin() / len;
        Self::new(half.cos(), axis.x * s, axis.y * s, axis.z * s)
    }

    /// Hamilton product: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// Pose of a child frame relative to its parent: a point expressed in the
/// child frame maps into the parent by rotating with `rotation` and then
/// adding `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::ZERO, Quaternion::identity())
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quaternion::identity())
    }

    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation + self.rotation.rotate(other.translation);
        let rotated = self.rotation.mul(other.rotation);
        Self::new(translated, rotated)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SpatialPoseSource
// ────────────────────────────────────────────────────────────────────────────

/// Read side of the tracking layer: per-frame poses of hands and mechanisms.
pub trait SpatialPoseSource {
    /// Pose of `frame` expressed in `reference`, or `None` when no chain of
    /// transforms connects them this frame.
    fn pose(&self, reference: &str, frame: &str) -> Option<Transform3D>;

    /// Position of `frame`'s origin expressed in `reference`.
    fn position(&self, reference: &str, frame: &str) -> Option<Vec3> {
        self.pose(reference, frame).map(|t| t.translation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PoseGraph
// ────────────────────────────────────────────────────────────────────────────

/// Directed graph of named frames and the [`Transform3D`]s that relate them.
///
/// Edges run parent → child; adding `"A" → "B"` does not create the inverse.
/// [`PoseGraph::lookup`] runs a BFS from the reference frame and composes
/// transforms along the shortest path.
#[derive(Debug, Default, Clone)]
pub struct PoseGraph {
    /// `edges[parent][child] = Transform3D`
    edges: HashMap<String, HashMap<String, Transform3D>>,
}

impl PoseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the pose of `child_frame` inside `parent_frame`.
    pub fn set_transform(&mut self, parent_frame: &str, child_frame: &str, transform: Transform3D) {
        self.edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), transform);
    }

    /// Convenience for frames that only translate relative to their parent.
    pub fn set_translation(&mut self, parent_frame: &str, child_frame: &str, translation: Vec3) {
        self.set_transform(parent_frame, child_frame, Transform3D::from_translation(translation));
    }

    /// Drop `child_frame` from under `parent_frame`. Returns whether an edge
    /// existed.
    pub fn remove(&mut self, parent_frame: &str, child_frame: &str) -> bool {
        self.edges
            .get_mut(parent_frame)
            .map(|children| children.remove(child_frame).is_some())
            .unwrap_or(false)
    }

    /// Compose the transform that maps points in `target_frame` into
    /// `source_frame`. Returns `None` if no path exists.
    pub fn lookup(&self, source_frame: &str, target_frame: &str) -> Option<Transform3D> {
        if source_frame == target_frame {
            return Some(Transform3D::identity());
        }

        let mut queue: VecDeque<(&str, Transform3D)> = VecDeque::new();
        let mut visited: HashSet<&str> = HashSet::new();

        queue.push_back((source_frame, Transform3D::identity()));
        visited.insert(source_frame);

        while let Some((current, accumulated)) = queue.pop_front() {
            let Some(children) = self.edges.get(current) else {
                continue;
            };
            for (next, edge_tf) in children {
                if !visited.insert(next.as_str()) {
                    continue;
                }
                let composed = accumulated.compose(*edge_tf);
                if next == target_frame {
                    return Some(composed);
                }
                queue.push_back((next.as_str(), composed));
            }
        }

        None
    }
}

impl SpatialPoseSource for PoseGraph {
    fn pose(&self, reference: &str, frame: &str) -> Option<Transform3D> {
        self.lookup(reference, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    #[test]
    fn vec3_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, -1.0, 2.0);
        assert!((a - b).approx_eq(Vec3::new(0.5, 3.0, 1.0), 1e-6));
        assert!((-a).approx_eq(Vec3::new(-1.0, -2.0, -3.0), 1e-6));
        assert!((a * 2.0).approx_eq(Vec3::new(2.0, 4.0, 6.0), 1e-6));
        assert!((Vec3::new(3.0, 4.0, 0.0).length() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(r.approx_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5), "got {r:?}");
    }

    #[test]
    fn axis_angle_matches_manual_quaternion() {
        let q = Quaternion::from_axis_angle_deg(Vec3::new(0.0, 0.0, 2.0), 90.0);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-5);
        assert_eq!(Quaternion::from_axis_angle_deg(Vec3::ZERO, 45.0), Quaternion::identity());
    }

    #[test]
    fn lookup_same_frame_returns_identity() {
        let poses = PoseGraph::new();
        assert_eq!(poses.lookup(WORLD, WORLD), Some(Transform3D::identity()));
    }

    #[test]
    fn lookup_composes_parented_hand() {
        let mut poses = PoseGraph::new();
        poses.set_translation(WORLD, "player", Vec3::new(1.0, 0.0, 0.0));
        poses.set_translation("player", "right_hand", Vec3::new(0.0, 1.5, 0.0));

        let p = poses.position(WORLD, "right_hand").unwrap();
        assert!(p.approx_eq(Vec3::new(1.0, 1.5, 0.0), 1e-5));
        // Measured in the rig frame, moving the rig does not move the hand.
        poses.set_translation(WORLD, "player", Vec3::new(9.0, 0.0, 0.0));
        let local = poses.position("player", "right_hand").unwrap();
        assert!(local.approx_eq(Vec3::new(0.0, 1.5, 0.0), 1e-5));
    }

    #[test]
    fn lookup_respects_rotation_in_chain() {
        let q90z = Quaternion::from_axis_angle_deg(Vec3::new(0.0, 0.0, 1.0), 90.0);
        let mut poses = PoseGraph::new();
        poses.set_transform(WORLD, "lever_mount", Transform3D::new(Vec3::ZERO, q90z));
        poses.set_translation("lever_mount", "handle", Vec3::new(1.0, 0.0, 0.0));

        let p = poses.position(WORLD, "handle").unwrap();
        assert!(p.approx_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5), "got {p:?}");
    }

    #[test]
    fn lookup_is_directional_and_misses_unknown_frames() {
        let mut poses = PoseGraph::new();
        poses.set_translation(WORLD, "player", Vec3::new(1.0, 0.0, 0.0));
        assert!(poses.lookup("player", WORLD).is_none());
        assert!(poses.lookup(WORLD, "ghost_hand").is_none());
    }

    #[test]
    fn remove_detaches_frame() {
        let mut poses = PoseGraph::new();
        poses.set_translation(WORLD, "left_hand", Vec3::new(0.0, 1.0, 0.0));
        assert!(poses.remove(WORLD, "left_hand"));
        assert!(!poses.remove(WORLD, "left_hand"));
        assert!(poses.position(WORLD, "left_hand").is_none());
    }
}
