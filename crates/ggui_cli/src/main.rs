//! Gource GUI - command-line entry point
//!
//! Handles:
//! - Configuration loading
//! - Application-level logging initialization
//! - Dispatch to the subcommands in `commands`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use chrono::NaiveDate;

use ggui_core::config::{ConfigManager, APP_DIR_NAME, SETTINGS_FILE_NAME};
use ggui_core::logging::{init_tracing_with_file, LogLevel};
use ggui_core::models::{CameraMode, ContainerFormat, QualityPreset, Resolution, Rgb};

mod commands;

#[derive(Parser)]
#[command(name = "gource-gui", version, about = "Validate repositories and drive gource")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for application logs (RUST_LOG overrides)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Check a directory and summarize its repository")]
    Validate {
        path: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Show the gource command that would run")]
    Preview {
        path: PathBuf,

        #[command(flatten)]
        visual: VisualArgs,

        /// One option per line
        #[arg(long)]
        pretty: bool,
    },

    #[command(about = "Run the visualization")]
    Run {
        path: PathBuf,

        #[command(flatten)]
        visual: VisualArgs,
    },

    #[command(about = "Render the visualization to a video file")]
    Export {
        path: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        quality: Option<QualityPreset>,

        /// Frames per second (25, 30 or 60)
        #[arg(long)]
        framerate: Option<u32>,

        /// Container (mp4, mov, avi, webm); defaults to the output extension
        #[arg(long, value_parser = parse_format)]
        format: Option<ContainerFormat>,

        #[command(flatten)]
        visual: VisualArgs,
    },

    #[command(about = "Report which external tools are installed")]
    Tools,
}

/// Overrides applied on top of the saved visualization settings.
#[derive(Args, Debug, Default)]
pub(crate) struct VisualArgs {
    /// Viewport as WIDTHxHEIGHT
    #[arg(long)]
    pub resolution: Option<Resolution>,

    #[arg(long)]
    pub seconds_per_day: Option<f64>,

    #[arg(long)]
    pub auto_skip_seconds: Option<f64>,

    #[arg(long, overrides_with = "no_fullscreen")]
    pub fullscreen: bool,

    /// Turn off a saved --fullscreen
    #[arg(long, overrides_with = "fullscreen")]
    pub no_fullscreen: bool,

    #[arg(long, overrides_with = "no_multi_sampling")]
    pub multi_sampling: bool,

    #[arg(long, overrides_with = "multi_sampling")]
    pub no_multi_sampling: bool,

    /// Background as #RRGGBB
    #[arg(long)]
    pub background: Option<Rgb>,

    #[arg(long)]
    pub font_scale: Option<f64>,

    /// Elements to hide (filenames, dirnames, usernames, bloom, progress, date, mouse)
    #[arg(long, value_delimiter = ',')]
    pub hide: Vec<String>,

    /// Elements to show again after a saved --hide
    #[arg(long, value_delimiter = ',')]
    pub show: Vec<String>,

    /// Show the file extension key
    #[arg(long, overrides_with = "no_key")]
    pub key: bool,

    #[arg(long, overrides_with = "key")]
    pub no_key: bool,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub user_image_dir: Option<PathBuf>,

    #[arg(long)]
    pub elasticity: Option<f64>,

    #[arg(long)]
    pub camera_mode: Option<CameraMode>,

    /// First day to show (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day to show (YYYY-MM-DD)
    #[arg(long)]
    pub stop_date: Option<NaiveDate>,
}

fn parse_format(value: &str) -> Result<ContainerFormat, String> {
    let lower = value.trim().trim_start_matches('.').to_ascii_lowercase();
    ContainerFormat::ALL
        .into_iter()
        .find(|f| f.extension() == lower)
        .ok_or_else(|| format!("unknown format '{}' (mp4, mov, avi, webm)", value))
}

/// Default config path: `<config dir>/gource-gui/settings.toml`.
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(APP_DIR_NAME)
        .join(SETTINGS_FILE_NAME)
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Load configuration first (needed for logs directory path)
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = ConfigManager::new(&config_path);

    if let Err(e) = config.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }

    let level = cli.log_level.unwrap_or(config.settings().logging.level);
    let logs_dir = config.logs_folder();
    let _log_guard = init_tracing_with_file(level, &logs_dir);

    tracing::info!("Gource GUI starting");
    tracing::debug!("Config: {}", config_path.display());
    tracing::debug!("Core version: {}", ggui_core::version());

    match cli.command {
        Commands::Validate { path, json } => commands::validate(&config, &path, json),
        Commands::Preview {
            path,
            visual,
            pretty,
        } => commands::preview(&config, &path, &visual, pretty),
        Commands::Run { path, visual } => commands::run(&mut config, &path, &visual),
        Commands::Export {
            path,
            output,
            quality,
            framerate,
            format,
            visual,
        } => {
            let export = commands::ExportArgs {
                output,
                quality,
                framerate,
                format,
            };
            commands::export(&mut config, &path, &visual, &export)
        }
        Commands::Tools => commands::tools(&config),
    }
}
