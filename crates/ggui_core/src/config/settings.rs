//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::{ExportOptions, VisualizationConfig};

/// Maximum number of remembered repositories.
pub const MAX_RECENT_REPOSITORIES: usize = 10;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Main window geometry.
    #[serde(default)]
    pub window: WindowSettings,

    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Last-used visualization options.
    #[serde(default)]
    pub visualization: VisualizationConfig,

    /// Last-used export options.
    #[serde(default)]
    pub export: ExportOptions,

    /// External tool locations and supervision timing.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), String> {
        self.visualization
            .validate()
            .map_err(|e| format!("[{}] {}", ConfigSection::Visualization.table_name(), e))
    }
}

/// Identifies a settings section for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Window,
    Paths,
    Visualization,
    Export,
    Tools,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Window,
        ConfigSection::Paths,
        ConfigSection::Visualization,
        ConfigSection::Export,
        ConfigSection::Tools,
        ConfigSection::Logging,
    ];

    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Window => "window",
            ConfigSection::Paths => "paths",
            ConfigSection::Visualization => "visualization",
            ConfigSection::Export => "export",
            ConfigSection::Tools => "tools",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Window => "Main window geometry",
            ConfigSection::Paths => "Recent repositories and folders",
            ConfigSection::Visualization => "Last-used gource options",
            ConfigSection::Export => "Last-used video export options",
            ConfigSection::Tools => "External tools and process supervision",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

/// Main window geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,

    /// Position, if the window was moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

fn default_window_width() -> u32 {
    900
}

fn default_window_height() -> u32 {
    700
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
            x: None,
            y: None,
        }
    }
}

/// Recent repositories and folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Most recently used repositories, newest first.
    #[serde(default)]
    pub recent_repositories: Vec<String>,

    /// Folder of the last exported video.
    #[serde(default)]
    pub last_export_dir: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            recent_repositories: Vec::new(),
            last_export_dir: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

impl PathSettings {
    /// Move `repo_path` to the front of the recent list.
    ///
    /// Duplicates are removed and the list is capped at
    /// `MAX_RECENT_REPOSITORIES`.
    pub fn add_recent_repository(&mut self, repo_path: &Path) {
        let entry = repo_path.to_string_lossy().to_string();
        self.recent_repositories.retain(|p| *p != entry);
        self.recent_repositories.insert(0, entry);
        self.recent_repositories.truncate(MAX_RECENT_REPOSITORIES);
    }
}

/// External tools and supervision timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Explicit gource executable (empty = search PATH).
    #[serde(default)]
    pub gource_path: String,

    /// Explicit ffmpeg executable (empty = search PATH).
    #[serde(default)]
    pub ffmpeg_path: String,

    /// Explicit git executable (empty = search PATH).
    #[serde(default)]
    pub git_path: String,

    /// How long the encoder may keep writing after a stop request.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Sleep between status checks in blocking waits.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_stop_grace_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            gource_path: String::new(),
            ffmpeg_path: String::new(),
            git_path: String::new(),
            stop_grace_ms: default_stop_grace_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ToolSettings {
    /// gource executable to run.
    pub fn gource(&self) -> &str {
        non_empty_or(&self.gource_path, "gource")
    }

    /// ffmpeg executable to run.
    pub fn ffmpeg(&self) -> &str {
        non_empty_or(&self.ffmpeg_path, "ffmpeg")
    }

    /// git executable to run.
    pub fn git(&self) -> &str {
        non_empty_or(&self.git_path, "git")
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Application log level (overridden by RUST_LOG).
    #[serde(default)]
    pub level: LogLevel,

    /// Keep child output out of run logs unless a run fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of child stderr lines kept for error messages.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Write a log file per run into the logs folder.
    #[serde(default)]
    pub write_run_logs: bool,

    /// Show timestamps in run logs.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            write_run_logs: false,
            show_timestamps: true,
        }
    }
}

impl LoggingSettings {
    /// Per-run logger configuration derived from these settings.
    pub fn run_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            error_tail: self.error_tail as usize,
            show_timestamps: self.show_timestamps,
        }
    }
}

/// Resolve the logs folder relative to a base directory.
pub fn resolve_logs_folder(paths: &PathSettings, base: &Path) -> PathBuf {
    let folder = PathBuf::from(&paths.logs_folder);
    if folder.is_absolute() {
        folder
    } else {
        base.join(folder)
    }
}
