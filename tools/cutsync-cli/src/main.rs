//! Cutsync CLI: offline tooling around the export pipeline.
//!
//! Usage:
//!   cutsync replay <EVENTS>     Replay a captured callback stream
//!   cutsync preset <NAME>       Resolve a preset to its export profile
//!   cutsync timecode <FRAME>    Convert a frame number to timecode
//!   cutsync check               Validate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "cutsync",
    about = "Flame shot export and cut reconciliation tooling",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the standard location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a captured host callback stream against in-memory services
    Replay {
        /// Path to a JSON array of host events
        events: PathBuf,

        /// Preset to select when the stream reaches export setup
        #[arg(short, long)]
        preset: Option<String>,

        /// Comments attached to created versions
        #[arg(long, default_value = "")]
        comments: String,

        /// Destination root the replayed export writes under
        #[arg(long, default_value = "/tmp/cutsync_replay")]
        destination: PathBuf,
    },

    /// Resolve a named preset and print its export profile document
    Preset {
        /// Preset name as configured
        name: String,
    },

    /// Convert a frame number to a timecode label
    Timecode {
        /// Absolute frame number
        frame: i64,

        /// Frame rate
        #[arg(long, default_value = "24.0")]
        fps: f64,

        /// Use drop-frame counting
        #[arg(long)]
        drop: bool,
    },

    /// Validate templates and presets in the configuration
    Check,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<cutsync_common::AppConfig> {
    match path {
        Some(path) => cutsync_common::AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("failed to load config from {}: {e}", path.display())),
        None => Ok(cutsync_common::AppConfig::load()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    cutsync_common::logging::init_logging(&cutsync_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Replay {
            events,
            preset,
            comments,
            destination,
        } => commands::replay::run(config, events, preset, comments, destination),
        Commands::Preset { name } => commands::preset::run(config, name),
        Commands::Timecode { frame, fps, drop } => commands::timecode::run(frame, fps, drop),
        Commands::Check => commands::check::run(config),
    }
}
