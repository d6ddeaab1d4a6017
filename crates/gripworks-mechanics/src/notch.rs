//! Evenly spaced notch grid over a lever's `[0, 1]` value.

use gripworks_types::NotchConfig;
use tracing::warn;

/// Float slack so a value sitting exactly on the tolerance boundary (0.24 vs
/// notch 0.25 with tolerance 0.01) still counts as "at" the notch.
const SNAP_SLACK: f32 = 1e-6;

/// A quantization grid of `count >= 2` evenly spaced notches.
#[derive(Debug, Clone, PartialEq)]
pub struct NotchGrid {
    count: usize,
    snap_tolerance: f32,
    feedback_strength: f32,
}

impl NotchGrid {
    /// Build the grid for `config`, or `None` when notches are disabled.
    ///
    /// A count below 2 cannot form a grid; notch behaviour is switched off
    /// and the lever falls back to continuous values.
    pub fn from_config(lever: &str, config: &NotchConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        if config.count < 2 {
            warn!(lever, count = config.count, "notch count below 2; notches disabled");
            return None;
        }
        Some(Self {
            count: config.count as usize,
            snap_tolerance: config.snap_tolerance.max(0.0),
            feedback_strength: config.feedback_strength,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn snap_tolerance(&self) -> f32 {
        self.snap_tolerance
    }

    pub fn feedback_strength(&self) -> f32 {
        self.feedback_strength
    }

    /// Distance in value space between neighbouring notches.
    pub fn spacing(&self) -> f32 {
        1.0 / (self.count - 1) as f32
    }

    /// Index of the nearest notch, ignoring the snap tolerance.
    pub fn closest_notch(&self, value: f32) -> usize {
        let raw = (value / self.spacing()).round();
        if raw.is_nan() || raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.count - 1)
        }
    }

    /// Value of notch `index`, clamped to `[0, 1]`.
    pub fn notch_value(&self, index: usize) -> f32 {
        (index as f32 * self.spacing()).clamp(0.0, 1.0)
    }

    /// Whether `value` is within the snap tolerance of notch `index`.
    pub fn is_at_notch(&self, value: f32, index: usize) -> bool {
        index < self.count && (value - self.notch_value(index)).abs() <= self.snap_tolerance + SNAP_SLACK
    }

    /// The notch `value` currently sits at, or `None` between notches.
    ///
    /// When tolerances overlap the lowest qualifying index wins.
    pub fn current_index(&self, value: f32) -> Option<usize> {
        (0..self.count).find(|&index| self.is_at_notch(value, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(count: u32, snap_tolerance: f32) -> NotchGrid {
        let config = NotchConfig {
            enabled: true,
            count,
            snap_tolerance,
            feedback_strength: 0.3,
        };
        NotchGrid::from_config("test", &config).expect("valid grid")
    }

    #[test]
    fn disabled_or_degenerate_config_yields_none() {
        let mut config = NotchConfig::default();
        assert!(NotchGrid::from_config("a", &config).is_none());
        config.enabled = true;
        config.count = 1;
        assert!(NotchGrid::from_config("a", &config).is_none());
        config.count = 0;
        assert!(NotchGrid::from_config("a", &config).is_none());
    }

    #[test]
    fn five_notches_are_quarter_spaced() {
        let g = grid(5, 0.03);
        assert!((g.spacing() - 0.25).abs() < 1e-6);
        assert!((g.notch_value(3) - 0.75).abs() < 1e-6);
        assert_eq!(g.notch_value(9), 1.0);
    }

    #[test]
    fn value_near_notch_respects_tolerance() {
        assert_eq!(grid(5, 0.01).current_index(0.24), Some(1));
        assert_eq!(grid(5, 0.03).current_index(0.24), Some(1));
        assert_eq!(grid(5, 0.009).current_index(0.24), None);
        assert_eq!(grid(5, 0.0).current_index(0.24), None);
    }

    #[test]
    fn exact_midpoint_notch_always_matches() {
        // Any tolerance that keeps notch 1 (0.25) out of reach.
        for tol in [0.0, 0.01, 0.03, 0.1, 0.2, 0.24] {
            assert_eq!(grid(5, tol).current_index(0.5), Some(2), "tolerance {tol}");
        }
    }

    #[test]
    fn closest_notch_ignores_tolerance_and_clamps() {
        let g = grid(5, 0.0);
        assert_eq!(g.closest_notch(0.1), 0);
        assert_eq!(g.closest_notch(0.13), 1);
        assert_eq!(g.closest_notch(0.99), 4);
        assert_eq!(g.closest_notch(3.0), 4);
        assert_eq!(g.closest_notch(-1.0), 0);
    }

    #[test]
    fn is_at_notch_rejects_out_of_grid_index() {
        let g = grid(3, 0.5);
        assert!(g.is_at_notch(1.0, 2));
        assert!(!g.is_at_notch(1.0, 3));
    }

    #[test]
    fn overlapping_tolerance_takes_lowest_index() {
        let g = grid(3, 0.5);
        // 0.3 is within tolerance of notch 0 (0.0) and of the nearer notch 1 (0.5).
        assert_eq!(g.current_index(0.3), Some(0));
        assert_eq!(g.current_index(0.25), Some(0));
        assert_eq!(g.current_index(1.0), Some(1));
        assert_eq!(grid(5, 0.3).current_index(0.5), Some(1));
    }
}
