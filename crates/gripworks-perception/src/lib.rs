//! `gripworks-perception` – spatial pose layer.
//!
//! Turns the tracking layer's per-frame hand and mechanism poses into a
//! queryable graph of named frames.
//!
//! # Modules
//!
//! - [`pose`] – [`PoseGraph`][pose::PoseGraph]: directed graph of frames that
//!   composes transforms between any two connected frames, exposed to the
//!   mechanics through the [`SpatialPoseSource`][pose::SpatialPoseSource] trait.

pub mod pose;

pub use pose::{PoseGraph, Quaternion, SpatialPoseSource, Transform3D, Vec3, WORLD};
