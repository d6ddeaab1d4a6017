//! Drive a [`Scene`] from a recorded JSON-lines trace.
//!
//! Each non-empty line is one [`TraceFrame`]: tracked poses, hinge angles
//! reported by physics, and interaction events, followed by a frame step.
//! Lines starting with `#` are comments.
//!
//! ```text
//! {"dt":0.016,"poses":[{"frame":"left_hand","position":[0,2,0.5]}],"events":[{"kind":"region_enter","hand":"left_hand"}]}
//! {"dt":0.016,"hinges":[{"lever":"vault_a","euler_deg":[50,0,0]}]}
//! ```

use std::io::BufRead;

use gripworks_perception::{Vec3, WORLD};
use gripworks_types::{GripError, LeverId};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scene::{FrameReport, InteractionEvent, Scene};

/// Position of a tracked frame inside `parent` (default `"world"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    #[serde(default = "default_parent")]
    pub parent: String,
    pub frame: String,
    pub position: [f32; 3],
}

/// Euler angles physics reports for a lever's hinge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HingeSample {
    pub lever: LeverId,
    pub euler_deg: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default)]
    pub poses: Vec<PoseSample>,
    #[serde(default)]
    pub hinges: Vec<HingeSample>,
    #[serde(default)]
    pub events: Vec<InteractionEvent>,
}

fn default_parent() -> String {
    WORLD.to_string()
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

/// Parse a JSON-lines trace.
///
/// # Errors
///
/// [`GripError::Serialization`] naming the first malformed line.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TraceFrame>, GripError> {
    let mut frames = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GripError::Serialization(format!("line {}: {e}", index + 1)))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame = serde_json::from_str(line)
            .map_err(|e| GripError::Serialization(format!("line {}: {e}", index + 1)))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Apply `frame`'s inputs to `scene` and step it once.
///
/// An event naming an unknown lever is logged and skipped; hinge samples for
/// unknown levers are skipped the same way.
pub fn apply_frame(scene: &mut Scene, frame: &TraceFrame) -> Result<FrameReport, GripError> {
    for pose in &frame.poses {
        scene
            .poses_mut()
            .set_translation(&pose.parent, &pose.frame, Vec3::from_array(pose.position));
    }
    for sample in &frame.hinges {
        match scene.hinge_mut(&sample.lever) {
            Some(hinge) => hinge.set_euler_deg(Vec3::from_array(sample.euler_deg))?,
            None => warn!(lever = %sample.lever, "hinge sample for unknown lever skipped"),
        }
    }
    for event in &frame.events {
        match scene.handle(event) {
            Ok(_) => {}
            Err(GripError::UnknownLever(lever)) => {
                warn!(%lever, "trace event for unknown lever skipped");
            }
            Err(error) => return Err(error),
        }
    }
    Ok(scene.step(frame.dt))
}

/// Replay every frame in order.
pub fn replay(scene: &mut Scene, frames: &[TraceFrame]) -> Result<Vec<FrameReport>, GripError> {
    frames.iter().map(|frame| apply_frame(scene, frame)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_toml_str;

    const SCENE: &str = r#"
        [[levers]]
        id = "gate"
        min_deg = 0.0
        max_deg = 90.0

        [[combinations]]
        id = "exit"
        requirements = [{ lever = "gate", check_mode = "above_value", required_value = 0.9 }]

        [[hands]]
        id = "left_hand"
        body = "player"

        [[climbers]]
        body = "player"
    "#;

    const TRACE: &str = r#"
# grab the gate and pull it open
{"dt":0.016,"events":[{"kind":"engage","lever":"gate","hand":"left_hand"}]}
{"hinges":[{"lever":"gate","euler_deg":[45,0,0]}]}

{"hinges":[{"lever":"gate","euler_deg":[90,0,0]}],"events":[{"kind":"set_value","lever":"nope","value":0.5}]}
{"poses":[{"frame":"left_hand","position":[0,2,0]}],"events":[{"kind":"region_enter","hand":"left_hand"}]}
{"poses":[{"frame":"left_hand","position":[0,1.5,0]}]}
"#;

    #[test]
    fn parses_frames_with_defaults() {
        let frames = parse_trace(TRACE.as_bytes()).expect("trace");
        assert_eq!(frames.len(), 5);
        assert!((frames[1].dt - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(frames[3].poses[0].parent, "world");
        assert!(matches!(frames[0].events[0], InteractionEvent::Engage { .. }));
    }

    #[test]
    fn malformed_line_is_reported_with_number() {
        let err = parse_trace("{\"dt\":0.1}\n{oops}\n".as_bytes()).unwrap_err();
        assert!(matches!(&err, GripError::Serialization(msg) if msg.starts_with("line 2")));
    }

    #[test]
    fn replay_opens_the_gate_and_climbs() {
        let mut scene = Scene::build(from_toml_str(SCENE).unwrap()).unwrap();
        let frames = parse_trace(TRACE.as_bytes()).unwrap();
        let reports = replay(&mut scene, &frames).expect("replay");

        assert_eq!(reports.len(), 5);
        assert!((reports[1].changes[0].new_value - 0.5).abs() < 1e-5);
        assert!(scene.combination("exit").unwrap().all_satisfied());
        assert!(reports[4].displacements[0].1.approx_eq(Vec3::new(0.0, 0.5, 0.0), 1e-5));
    }
}
