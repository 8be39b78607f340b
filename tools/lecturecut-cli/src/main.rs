//! lecturecut CLI: plan and render lecture edits.
//!
//! Usage:
//!   lecturecut edit <VIDEO> <OUTPUT>   Edit a recording into a finished video
//!   lecturecut plan                    Print the timeline without rendering
//!   lecturecut check                   Check for ffmpeg and ffprobe
//!   lecturecut config                  Show or initialize the configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lecturecut_common::config::{config_file_path, AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "lecturecut",
    about = "Lecture recording editor: retime drawings to narration and stitch the sections",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// How to find segment boundaries.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Segmentation {
    /// Event log recorded alongside the lecture
    #[arg(long)]
    log: Option<PathBuf>,

    /// Segment on silences in the recording's audio instead of a log
    #[arg(long)]
    silence: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a recording into a finished video
    Edit {
        /// Source recording
        video: PathBuf,

        /// Edited output file
        output: PathBuf,

        #[command(flatten)]
        segmentation: Segmentation,

        /// Working directory for intermediate clips
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Remove the working directory after a successful run
        #[arg(long)]
        cleanup: bool,

        /// Maximum number of segments processed at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Write a JSON report of the run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the timeline a recording would be edited with
    Plan {
        #[command(flatten)]
        segmentation: Segmentation,

        /// Probe this recording for its duration
        #[arg(long, conflicts_with = "duration")]
        video: Option<PathBuf>,

        /// Recording duration in seconds, instead of probing a video
        #[arg(long)]
        duration: Option<f64>,

        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the media tools are installed
    Check,

    /// Show the effective configuration
    Config {
        /// Write the defaults to the configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, fallback) = match (&cli.command, &cli.config) {
        (Commands::Config { init: true }, _) => (AppConfig::default(), None),
        (_, Some(path)) => (AppConfig::load_from(path)?, None),
        (_, None) => AppConfig::load(),
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    lecturecut_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });
    if let Some(err) = fallback {
        tracing::warn!(
            path = %config_file_path().display(),
            error = %err,
            "Failed to load config; using defaults"
        );
    }
    tracing::debug!(work_dir = %config.work_dir.display(), "Configuration loaded");

    match cli.command {
        Commands::Edit {
            video,
            output,
            segmentation,
            work_dir,
            cleanup,
            jobs,
            report,
        } => {
            commands::edit::run(
                config,
                video,
                output,
                segmentation.into(),
                work_dir,
                cleanup,
                jobs,
                report,
            )
            .await
        }
        Commands::Plan {
            segmentation,
            video,
            duration,
            json,
        } => commands::plan::run(config, segmentation.into(), video, duration, json),
        Commands::Check => commands::check::run(&config),
        Commands::Config { init } => commands::config::run(config, cli.config, init),
    }
}

impl From<Segmentation> for lecturecut_render_engine::SegmentationSource {
    fn from(segmentation: Segmentation) -> Self {
        match segmentation.log {
            Some(path) if !segmentation.silence => Self::EventLog(path),
            _ => Self::Silence,
        }
    }
}
