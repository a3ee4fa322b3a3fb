//! ggui_core - Backend logic for Gource GUI
//!
//! This crate contains all non-UI logic: repository validation, gource and
//! ffmpeg command building, process supervision and settings. It can be used
//! by a GUI front-end or the CLI tool.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ggui_core::command;
//! use ggui_core::models::VisualizationConfig;
//! use ggui_core::supervisor::Supervisor;
//! use ggui_core::validation::validate;
//!
//! let info = validate(Path::new("/path/to/repo")).unwrap();
//! let args = command::build(&VisualizationConfig::default(), info.path()).unwrap();
//!
//! let supervisor = Supervisor::new();
//! let mut run = supervisor.start(&args).unwrap();
//! let status = supervisor.wait(&mut run);
//! println!("{status}");
//! ```

pub mod command;
pub mod config;
pub mod logging;
pub mod models;
pub mod supervisor;
pub mod tools;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
