//! Implementations of the `gripworks` subcommands.
//!
//! Each command writes its user-facing output to the supplied writer so it
//! can be exercised in tests; `main` passes stdout.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use colored::Colorize;
use gripworks_middleware::{EventBus, Topic, TopicReceiver};
use gripworks_runtime::config::{self, ConfigWarning};
use gripworks_runtime::replay::{apply_frame, parse_trace};
use gripworks_runtime::Scene;
use gripworks_types::SceneConfig;

/// Outcome of `gripworks check`.
#[derive(Debug)]
pub struct CheckOutcome {
    pub config: SceneConfig,
    pub warnings: Vec<ConfigWarning>,
}

/// Load, validate and lint the scene at `path`, then build it once with
/// simulation drivers to surface wiring errors.
pub fn check(path: &Path, out: &mut impl Write) -> Result<CheckOutcome, String> {
    let scene_config = config::load_from(path).map_err(|e| e.to_string())?;
    let warnings = config::lint(&scene_config);
    Scene::build(scene_config.clone()).map_err(|e| format!("scene does not build: {e}"))?;

    write_line(
        out,
        format!(
            "{} {} ({} lever(s), {} combination(s), {} hand(s), {} climber(s))",
            "✓".green(),
            path.display().to_string().bold(),
            scene_config.levers.len(),
            scene_config.combinations.len(),
            scene_config.hands.len(),
            scene_config.climbers.len(),
        ),
    )?;
    for warning in &warnings {
        write_line(out, format!("  {} {warning}", "warning:".yellow().bold()))?;
    }
    Ok(CheckOutcome {
        config: scene_config,
        warnings,
    })
}

/// JSON schema of scene files, pretty printed.
pub fn schema() -> Result<String, String> {
    let schema = schemars::schema_for!(SceneConfig);
    serde_json::to_string_pretty(&schema).map_err(|e| e.to_string())
}

/// Totals printed after a replay.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub frames: usize,
    pub events: usize,
    pub faults: usize,
}

/// Replay `trace_path` against the scene at `scene_path`, printing every
/// emitted event as one JSON line.
pub fn replay(
    scene_path: &Path,
    trace_path: &Path,
    show_gizmos: bool,
    out: &mut impl Write,
) -> Result<ReplayOutcome, String> {
    let scene_config = config::load_from(scene_path).map_err(|e| e.to_string())?;
    let trace = File::open(trace_path)
        .map_err(|e| format!("failed to open trace at {}: {e}", trace_path.display()))?;
    let frames = parse_trace(BufReader::new(trace)).map_err(|e| e.to_string())?;

    let bus = EventBus::default();
    let mut receivers: Vec<TopicReceiver> = Topic::ALL.iter().map(|t| bus.subscribe_to(*t)).collect();
    let mut scene = Scene::builder(scene_config)
        .with_event_bus(bus)
        .build()
        .map_err(|e| e.to_string())?;

    let mut outcome = ReplayOutcome::default();
    // Events raised while building (combinations satisfied from the start).
    outcome.events += print_events(&mut receivers, 0, out)?;

    for frame in &frames {
        let report = apply_frame(&mut scene, frame).map_err(|e| e.to_string())?;
        outcome.frames += 1;
        outcome.faults += report.faults.len();
        for fault in &report.faults {
            write_line(out, format!("{} frame {}: {fault}", "fault:".red().bold(), report.frame))?;
        }
        outcome.events += print_events(&mut receivers, report.frame, out)?;
    }

    if show_gizmos {
        for gizmo in scene.gizmos() {
            write_line(out, gizmo.to_json().map_err(|e| e.to_string())?)?;
        }
    }
    for combination in scene.combinations() {
        let state = if combination.all_satisfied() {
            "satisfied".green()
        } else {
            "unsatisfied".dimmed()
        };
        write_line(out, format!("combination {}: {state}", combination.id().bold()))?;
    }
    write_line(
        out,
        format!(
            "{} frame(s), {} event(s), {} fault(s)",
            outcome.frames, outcome.events, outcome.faults
        ),
    )?;
    Ok(outcome)
}

fn print_events(
    receivers: &mut [TopicReceiver],
    frame: u64,
    out: &mut impl Write,
) -> Result<usize, String> {
    let mut count = 0;
    for receiver in receivers.iter_mut() {
        for event in receiver.drain() {
            let json = serde_json::to_string(&event).map_err(|e| e.to_string())?;
            write_line(out, format!("{frame:>5} {json}"))?;
            count += 1;
        }
    }
    Ok(count)
}

fn write_line(out: &mut impl Write, line: impl std::fmt::Display) -> Result<(), String> {
    writeln!(out, "{line}").map_err(|e| format!("failed to write output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
        [[levers]]
        id = "gate"
        min_deg = 0.0
        max_deg = 90.0
        notches = { enabled = true, count = 3 }

        [[combinations]]
        id = "exit"
        requirements = [{ lever = "gate", check_mode = "notch_index", required_notch = 2 }]

        [[hands]]
        id = "left_hand"
    "#;

    const TRACE: &str = r#"{"events":[{"kind":"engage","lever":"gate","hand":"left_hand"}]}
{"hinges":[{"lever":"gate","euler_deg":[90,0,0]}]}
"#;

    fn write_files(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let scene = dir.join("scene.toml");
        let trace = dir.join("trace.jsonl");
        std::fs::write(&scene, SCENE).expect("scene");
        std::fs::write(&trace, TRACE).expect("trace");
        (scene, trace)
    }

    #[test]
    fn check_reports_scene_summary() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (scene, _) = write_files(dir.path());
        let mut out = Vec::new();
        let outcome = check(&scene, &mut out).expect("check");
        assert!(outcome.warnings.is_empty());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 lever(s)"));
    }

    #[test]
    fn check_fails_on_missing_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let mut out = Vec::new();
        assert!(check(&dir.path().join("missing.toml"), &mut out).is_err());
    }

    #[test]
    fn schema_describes_levers() {
        let schema = schema().expect("schema");
        assert!(schema.contains("\"levers\""));
        assert!(schema.contains("\"snap_tolerance\""));
    }

    #[test]
    fn replay_prints_events_and_summary() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (scene, trace) = write_files(dir.path());
        let mut out = Vec::new();
        let outcome = replay(&scene, &trace, true, &mut out).expect("replay");

        assert_eq!(outcome.frames, 2);
        assert_eq!(outcome.faults, 0);
        // value change, notch crossing, combination satisfied
        assert_eq!(outcome.events, 3);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"kind\":\"combination_satisfied\""));
        assert!(text.contains("\"lever\":\"gate\""));
    }
}
