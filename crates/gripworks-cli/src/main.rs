//! `gripworks` – scene tooling for physical puzzle mechanics.
//!
//! ```text
//! gripworks check  [scene.toml]           validate a scene and print warnings
//! gripworks schema                        print the scene JSON schema
//! gripworks replay <scene.toml> <trace>   replay a JSON-lines trace, print events
//! ```
//!
//! `check` falls back to `$GRIPWORKS_SCENE` when no path is given. Logging is
//! configured through `RUST_LOG` and `GRIPWORKS_LOG_FORMAT`.

mod commands;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use gripworks_runtime::config::{SCENE_ENV, scene_path_from_env};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "gripworks", version, about = "Physical puzzle mechanics tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a scene file and print design-time warnings.
    Check {
        /// Scene file (defaults to $GRIPWORKS_SCENE).
        scene: Option<PathBuf>,
        /// Exit non-zero when any warning is reported.
        #[arg(long)]
        strict: bool,
    },
    /// Print the JSON schema of scene files.
    Schema,
    /// Replay a JSON-lines trace against a scene and print emitted events.
    Replay {
        scene: PathBuf,
        trace: PathBuf,
        /// Also print a debug gizmo per lever after the last frame.
        #[arg(long)]
        gizmos: bool,
    },
}

fn main() -> ExitCode {
    let _guard = gripworks_runtime::init_tracing("gripworks");
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match cli.command {
        Command::Check { scene, strict } => {
            let Some(path) = scene.or_else(scene_path_from_env) else {
                eprintln!("{} no scene given and {SCENE_ENV} is not set", "error:".red().bold());
                return ExitCode::from(2);
            };
            commands::check(&path, &mut out).and_then(|outcome| {
                if strict && !outcome.warnings.is_empty() {
                    Err(format!("{} warning(s) in strict mode", outcome.warnings.len()))
                } else {
                    Ok(())
                }
            })
        }
        Command::Schema => commands::schema()
            .and_then(|schema| writeln!(out, "{schema}").map_err(|e| e.to_string())),
        Command::Replay {
            scene,
            trace,
            gizmos,
        } => commands::replay(&scene, &trace, gizmos, &mut out).map(|_| ()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(%message, "command failed");
            eprintln!("{} {message}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
