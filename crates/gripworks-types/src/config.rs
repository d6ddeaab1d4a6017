//! Static configuration for levers, combinations, hands and climbers.
//!
//! Everything here is set at construction time and never mutated at runtime.
//! The only sanctioned mutation path is [`SceneConfig::validated`], which
//! clamps every field into its valid range the same way a design-time editor
//! would.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ActorId, BodyId, LeverId};

/// Which rotational axis of the mechanism is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MountAxis {
    /// Floor-mounted levers rotate about X.
    #[default]
    X,
    Y,
    /// Typical for wall-mounted levers that swing up/down.
    Z,
}

/// How a requirement inspects its lever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// `|value - required_value| <= tolerance`
    #[default]
    ExactValue,
    /// Lever has notches and sits at `required_notch`.
    NotchIndex,
    /// `value >= required_value`
    AboveValue,
    /// `value <= required_value`
    BelowValue,
}

/// Optional quantization grid over the lever's `[0, 1]` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotchConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Number of evenly spaced notch points (2 = just the ends).
    #[serde(default = "default_notch_count")]
    pub count: u32,
    /// Max distance in value space for the lever to count as "at" a notch.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f32,
    /// Strength of the pulse fired when the lever enters a notch.
    #[serde(default = "default_notch_feedback")]
    pub feedback_strength: f32,
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: default_notch_count(),
            snap_tolerance: default_snap_tolerance(),
            feedback_strength: default_notch_feedback(),
        }
    }
}

/// Per-lever configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LeverConfig {
    pub id: LeverId,
    /// Angle (degrees) that maps to value 0.
    pub min_deg: f32,
    /// Angle (degrees) that maps to value 1.
    pub max_deg: f32,
    #[serde(default)]
    pub mount_axis: MountAxis,
    #[serde(default)]
    pub notches: NotchConfig,
    /// Continuous haptic strength while an actor grips the lever.
    #[serde(default = "default_vibration_strength")]
    pub vibration_strength: f32,
    #[serde(default = "default_true")]
    pub interactable: bool,
    #[serde(default)]
    pub initial_value: f32,
}

impl LeverConfig {
    /// A lever spanning `[min_deg, max_deg]` with every other field defaulted.
    pub fn new(id: impl Into<LeverId>, min_deg: f32, max_deg: f32) -> Self {
        Self {
            id: id.into(),
            min_deg,
            max_deg,
            mount_axis: MountAxis::default(),
            notches: NotchConfig::default(),
            vibration_strength: default_vibration_strength(),
            interactable: true,
            initial_value: 0.0,
        }
    }

    /// Enable `count` notches, keeping the other notch settings.
    pub fn with_notches(mut self, count: u32) -> Self {
        self.notches.enabled = true;
        self.notches.count = count;
        self
    }

    pub fn with_axis(mut self, axis: MountAxis) -> Self {
        self.mount_axis = axis;
        self
    }

    /// Clamp every field into its valid range.
    ///
    /// A notch count below 2 is left alone: the lever disables notch
    /// behaviour for it instead.
    pub fn validated(mut self) -> Self {
        self.min_deg = finite_or(self.min_deg, 0.0);
        self.max_deg = finite_or(self.max_deg, 0.0);
        self.vibration_strength = finite_or(self.vibration_strength, 0.0).clamp(0.0, 1.0);
        self.initial_value = finite_or(self.initial_value, 0.0).clamp(0.0, 1.0);
        self.notches.count = self.notches.count.min(MAX_NOTCHES);
        self.notches.snap_tolerance = finite_or(self.notches.snap_tolerance, 0.0).max(0.0);
        self.notches.feedback_strength =
            finite_or(self.notches.feedback_strength, 0.0).clamp(0.05, 0.5);
        self
    }
}

/// One lever's requirement inside a combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequirementConfig {
    /// The lever this requirement reads. `None` (or an id that does not
    /// resolve) makes the requirement inert.
    #[serde(default)]
    pub lever: Option<LeverId>,
    #[serde(default)]
    pub check_mode: CheckMode,
    #[serde(default = "default_required_value")]
    pub required_value: f32,
    #[serde(default)]
    pub required_notch: u32,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// Optional human-readable label used in log output.
    #[serde(default)]
    pub label: String,
}

impl RequirementConfig {
    pub fn new(lever: impl Into<LeverId>, check_mode: CheckMode) -> Self {
        Self {
            lever: Some(lever.into()),
            check_mode,
            required_value: default_required_value(),
            required_notch: 0,
            tolerance: default_tolerance(),
            label: String::new(),
        }
    }

    pub fn value(mut self, required_value: f32) -> Self {
        self.required_value = required_value;
        self
    }

    pub fn notch(mut self, required_notch: u32) -> Self {
        self.required_notch = required_notch;
        self
    }

    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validated(mut self) -> Self {
        self.required_value = finite_or(self.required_value, 1.0).clamp(0.0, 1.0);
        self.required_notch = self.required_notch.min(MAX_NOTCHES - 1);
        self.tolerance = finite_or(self.tolerance, default_tolerance()).clamp(0.01, 0.5);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CombinationConfig {
    pub id: String,
    #[serde(default)]
    pub requirements: Vec<RequirementConfig>,
}

/// A recognized hand. Only hands listed here can grip levers or climb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HandConfig {
    pub id: ActorId,
    /// The locomotion body this hand belongs to, if any.
    #[serde(default)]
    pub body: Option<BodyId>,
    /// Whether a haptic device is attached to the hand.
    #[serde(default = "default_true")]
    pub haptics: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClimberConfig {
    pub body: BodyId,
    /// Frame hand positions are measured in. Use the body's own tracking
    /// frame when hands are parented under the body.
    #[serde(default = "default_reference_frame")]
    pub reference_frame: String,
    #[serde(default)]
    pub start_position: [f32; 3],
}

/// Global thresholds shared by every lever in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tuning {
    /// Minimum value delta that produces a change notification.
    #[serde(default = "default_change_threshold")]
    pub change_threshold: f32,
    /// Idle drift (degrees) tolerated before the mechanism is snapped back.
    #[serde(default = "default_angle_tolerance")]
    pub angle_correction_tolerance_deg: f32,
    /// Length of the pulse fired on entering a notch.
    #[serde(default = "default_notch_pulse")]
    pub notch_pulse_duration_s: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            change_threshold: default_change_threshold(),
            angle_correction_tolerance_deg: default_angle_tolerance(),
            notch_pulse_duration_s: default_notch_pulse(),
        }
    }
}

impl Tuning {
    pub fn validated(mut self) -> Self {
        self.change_threshold =
            finite_or(self.change_threshold, default_change_threshold()).max(0.0);
        self.angle_correction_tolerance_deg =
            finite_or(self.angle_correction_tolerance_deg, default_angle_tolerance()).max(0.0);
        self.notch_pulse_duration_s =
            finite_or(self.notch_pulse_duration_s, default_notch_pulse()).max(0.0);
        self
    }
}

/// A whole puzzle scene: levers, combinations, hands and climbing bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneConfig {
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default)]
    pub levers: Vec<LeverConfig>,
    #[serde(default)]
    pub combinations: Vec<CombinationConfig>,
    #[serde(default)]
    pub hands: Vec<HandConfig>,
    #[serde(default)]
    pub climbers: Vec<ClimberConfig>,
}

impl SceneConfig {
    /// Clamp every nested config into its valid range.
    pub fn validated(mut self) -> Self {
        self.tuning = self.tuning.validated();
        self.levers = self.levers.into_iter().map(LeverConfig::validated).collect();
        for combination in &mut self.combinations {
            combination.requirements = std::mem::take(&mut combination.requirements)
                .into_iter()
                .map(RequirementConfig::validated)
                .collect();
        }
        self
    }
}

const MAX_NOTCHES: u32 = 10;

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}

fn default_true() -> bool {
    true
}
fn default_notch_count() -> u32 {
    5
}
fn default_snap_tolerance() -> f32 {
    0.03
}
fn default_notch_feedback() -> f32 {
    0.3
}
fn default_vibration_strength() -> f32 {
    0.2
}
fn default_required_value() -> f32 {
    1.0
}
fn default_tolerance() -> f32 {
    0.05
}
fn default_reference_frame() -> String {
    "world".to_string()
}
fn default_change_threshold() -> f32 {
    0.001
}
fn default_angle_tolerance() -> f32 {
    0.1
}
fn default_notch_pulse() -> f32 {
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lever_defaults_match_component_defaults() {
        let cfg = LeverConfig::new("a", -45.0, 45.0);
        assert_eq!(cfg.mount_axis, MountAxis::X);
        assert!(!cfg.notches.enabled);
        assert_eq!(cfg.notches.count, 5);
        assert!((cfg.vibration_strength - 0.2).abs() < f32::EPSILON);
        assert!((cfg.notches.snap_tolerance - 0.03).abs() < f32::EPSILON);
    }

    #[test]
    fn validated_clamps_requirement_tolerance() {
        let tight = RequirementConfig::new("a", CheckMode::ExactValue).tolerance(0.0001);
        assert!((tight.validated().tolerance - 0.01).abs() < f32::EPSILON);

        let loose = RequirementConfig::new("a", CheckMode::ExactValue).tolerance(2.0);
        assert!((loose.validated().tolerance - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn validated_keeps_degenerate_notch_count() {
        let cfg = LeverConfig::new("a", 0.0, 90.0).with_notches(1).validated();
        assert_eq!(cfg.notches.count, 1);

        let many = LeverConfig::new("a", 0.0, 90.0).with_notches(40).validated();
        assert_eq!(many.notches.count, 10);
    }

    #[test]
    fn validated_replaces_non_finite_angles() {
        let cfg = LeverConfig::new("a", f32::NAN, 90.0).validated();
        assert_eq!(cfg.min_deg, 0.0);
        assert_eq!(cfg.max_deg, 90.0);
    }

    #[test]
    fn scene_config_deserializes_with_defaults() {
        let json = r#"{
            "levers": [{ "id": "a", "min_deg": -30.0, "max_deg": 30.0,
                         "notches": { "enabled": true } }],
            "combinations": [{ "id": "door",
                               "requirements": [{ "lever": "a", "check_mode": "notch_index", "required_notch": 2 }] }]
        }"#;
        let cfg: SceneConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.levers[0].notches.count, 5);
        let req = &cfg.combinations[0].requirements[0];
        assert_eq!(req.check_mode, CheckMode::NotchIndex);
        assert_eq!(req.required_notch, 2);
        assert!((req.tolerance - 0.05).abs() < f32::EPSILON);
        assert!((cfg.tuning.change_threshold - 0.001).abs() < f32::EPSILON);
    }
}
