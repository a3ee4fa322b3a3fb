//! Configuration management.
//!
//! Settings live in a single TOML file with one table per section:
//!
//! ```toml
//! [window]
//! width = 900
//! height = 700
//!
//! [visualization]
//! resolution = "1280x720"
//! seconds_per_day = 10.0
//! ```
//!
//! `ConfigManager` loads, fills in defaults, and writes sections back
//! atomically.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    resolve_logs_folder, ConfigSection, LoggingSettings, PathSettings, Settings, ToolSettings,
    WindowSettings, MAX_RECENT_REPOSITORIES,
};

/// Directory name used under the platform config directory.
pub const APP_DIR_NAME: &str = "gource-gui";

/// Settings file name inside the app directory.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
