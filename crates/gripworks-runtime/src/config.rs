//! Scene file loading and design-time checks.
//!
//! Scenes are TOML files deserialized into [`SceneConfig`]. Loading always
//! returns the [`validated`](SceneConfig::validated) form, so out-of-range
//! numbers are clamped rather than rejected. [`lint`] reports what clamping
//! cannot fix: dangling lever references, degenerate ranges, notch grids that
//! will be disabled.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use gripworks_mechanics::{AngleRange, normalize_angle};
use gripworks_types::{CheckMode, SceneConfig};
use thiserror::Error;

/// Names the scene file the CLI opens when no path is given.
pub const SCENE_ENV: &str = "GRIPWORKS_SCENE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scene at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parse a scene from TOML text.
pub fn from_toml_str(raw: &str) -> Result<SceneConfig, ConfigError> {
    let config: SceneConfig = toml::from_str(raw)?;
    Ok(config.validated())
}

/// Read and parse the scene at `path`.
pub fn load_from(path: &Path) -> Result<SceneConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&raw)
}

/// The scene path named by `GRIPWORKS_SCENE`, if set and non-empty.
pub fn scene_path_from_env() -> Option<PathBuf> {
    std::env::var(SCENE_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

// ────────────────────────────────────────────────────────────────────────────
// Lint
// ────────────────────────────────────────────────────────────────────────────

/// A problem found in a scene that still loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// What the warning is about, e.g. `lever vault_a`.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

fn warning(subject: impl Into<String>, message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        subject: subject.into(),
        message: message.into(),
    }
}

/// Every design-time problem in `config`, in file order.
pub fn lint(config: &SceneConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let mut levers = HashSet::new();

    for lever in &config.levers {
        let subject = format!("lever {}", lever.id);
        if !levers.insert(&lever.id) {
            warnings.push(warning(&subject, "duplicate lever id"));
        }
        let range = AngleRange::new(lever.min_deg, lever.max_deg);
        if range.is_degenerate() {
            warnings.push(warning(&subject, "min and max angle are equal; value is pinned to 0"));
        }
        for bound in [lever.min_deg, lever.max_deg] {
            if (normalize_angle(bound) - bound).abs() > 1e-3 {
                warnings.push(warning(
                    &subject,
                    format!("angle {bound} lies outside (-180, 180]; readings will wrap"),
                ));
            }
        }
        if lever.notches.enabled {
            if lever.notches.count < 2 {
                warnings.push(warning(&subject, "notch count below 2; notches will be disabled"));
            } else {
                let half_spacing = 0.5 / (lever.notches.count - 1) as f32;
                if lever.notches.snap_tolerance >= half_spacing {
                    warnings.push(warning(
                        &subject,
                        format!(
                            "snap tolerance {} overlaps neighbouring notches (spacing {})",
                            lever.notches.snap_tolerance,
                            2.0 * half_spacing
                        ),
                    ));
                }
            }
        }
    }

    for combination in &config.combinations {
        let subject = format!("combination {}", combination.id);
        if combination.requirements.is_empty() {
            warnings.push(warning(&subject, "no requirements; combination is always satisfied"));
        }
        for (index, requirement) in combination.requirements.iter().enumerate() {
            let Some(lever_id) = &requirement.lever else {
                warnings.push(warning(&subject, format!("requirement {index} names no lever")));
                continue;
            };
            let Some(lever) = config.levers.iter().find(|l| &l.id == lever_id) else {
                warnings.push(warning(
                    &subject,
                    format!("requirement {index} references unknown lever {lever_id}"),
                ));
                continue;
            };
            if requirement.check_mode == CheckMode::NotchIndex {
                if !lever.notches.enabled || lever.notches.count < 2 {
                    warnings.push(warning(
                        &subject,
                        format!("requirement {index} checks a notch but lever {lever_id} has no notches"),
                    ));
                } else if requirement.required_notch >= lever.notches.count {
                    warnings.push(warning(
                        &subject,
                        format!(
                            "requirement {index} wants notch {} but lever {lever_id} has {}",
                            requirement.required_notch, lever.notches.count
                        ),
                    ));
                }
            }
        }
    }

    let climbing_bodies: HashSet<_> = config.climbers.iter().map(|c| &c.body).collect();
    for hand in &config.hands {
        if let Some(body) = &hand.body
            && !climbing_bodies.contains(body)
        {
            warnings.push(warning(
                format!("hand {}", hand.id),
                format!("body {body} has no climber; climbable regions will ignore this hand"),
            ));
        }
    }
    for climber in &config.climbers {
        if !config.hands.iter().any(|h| h.body.as_ref() == Some(&climber.body)) {
            warnings.push(warning(format!("climber {}", climber.body), "no hand belongs to this body"));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT: &str = r#"
        [tuning]
        change_threshold = 0.002

        [[levers]]
        id = "vault_a"
        min_deg = -45.0
        max_deg = 45.0
        notches = { enabled = true, count = 5 }

        [[levers]]
        id = "vault_b"
        min_deg = 0.0
        max_deg = 90.0
        mount_axis = "z"
        vibration_strength = 4.0

        [[combinations]]
        id = "vault"
        requirements = [
            { lever = "vault_a", check_mode = "notch_index", required_notch = 2 },
            { lever = "vault_b", check_mode = "above_value", required_value = 0.8 },
        ]

        [[hands]]
        id = "left_hand"
        body = "player"

        [[climbers]]
        body = "player"
    "#;

    #[test]
    fn parses_scene_with_defaults_and_clamps() {
        let scene = from_toml_str(VAULT).expect("valid scene");
        assert_eq!(scene.levers.len(), 2);
        assert!((scene.tuning.change_threshold - 0.002).abs() < 1e-6);
        assert!((scene.tuning.angle_correction_tolerance_deg - 0.1).abs() < 1e-6);
        assert!((scene.levers[0].notches.snap_tolerance - 0.03).abs() < 1e-6);
        assert_eq!(scene.levers[1].vibration_strength, 1.0);
        assert_eq!(scene.combinations[0].requirements[1].check_mode, CheckMode::AboveValue);
        assert_eq!(scene.climbers[0].reference_frame, "world");
        assert!(lint(&scene).is_empty(), "{:?}", lint(&scene));
    }

    #[test]
    fn parse_error_is_reported() {
        let err = from_toml_str("[[levers]]\nid = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("vault.toml");
        std::fs::write(&path, VAULT).expect("write");
        let scene = load_from(&path).expect("load");
        assert_eq!(scene.combinations[0].id, "vault");
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn lint_flags_dangling_and_degenerate_setups() {
        let scene = from_toml_str(
            r#"
            [[levers]]
            id = "flat"
            min_deg = 10.0
            max_deg = 10.0
            notches = { enabled = true, count = 1 }

            [[levers]]
            id = "wide"
            min_deg = 0.0
            max_deg = 270.0

            [[combinations]]
            id = "broken"
            requirements = [
                { lever = "ghost" },
                { lever = "wide", check_mode = "notch_index" },
                {},
            ]

            [[combinations]]
            id = "empty"
            "#,
        )
        .expect("still loads");

        let text: Vec<String> = lint(&scene).iter().map(ToString::to_string).collect();
        let has = |needle: &str| text.iter().any(|w| w.contains(needle));
        assert!(has("lever flat: min and max angle are equal"));
        assert!(has("notch count below 2"));
        assert!(has("angle 270 lies outside"));
        assert!(has("unknown lever ghost"));
        assert!(has("has no notches"));
        assert!(has("requirement 2 names no lever"));
        assert!(has("combination empty: no requirements"));
    }

    #[test]
    fn lint_flags_overlapping_snap_tolerance() {
        let mut scene = from_toml_str(VAULT).expect("valid");
        scene.levers[0].notches.snap_tolerance = 0.2;
        assert!(lint(&scene).iter().any(|w| w.message.contains("overlaps")));
    }

    #[test]
    fn scene_path_from_env_reads_variable() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var(SCENE_ENV, "/tmp/vault.toml") };
        assert_eq!(scene_path_from_env(), Some(PathBuf::from("/tmp/vault.toml")));
        unsafe { std::env::set_var(SCENE_ENV, "  ") };
        assert_eq!(scene_path_from_env(), None);
        unsafe { std::env::remove_var(SCENE_ENV) };
    }
}
