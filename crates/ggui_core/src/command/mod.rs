//! Command building for the external tools.
//!
//! # Architecture
//!
//! - **gource_builder**: Converts a `VisualizationConfig` into gource command tokens
//! - **encoder_builder**: Builds the ffmpeg side of an export pipeline
//! - **preview**: Renders tokens for display ("Preview Command")
//!
//! Builders are pure: the same inputs always produce the same tokens.

mod encoder_builder;
mod gource_builder;
mod preview;

use std::path::Path;

use thiserror::Error;

pub use encoder_builder::{export_stream_args, EncoderOptionsBuilder, FFMPEG_EXECUTABLE};
pub use gource_builder::{format_decimal, GourceOptionsBuilder, GOURCE_EXECUTABLE};
pub use preview::{format_tokens, format_tokens_pretty, preview};

use crate::models::VisualizationConfig;

/// Errors raised while building a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The configuration cannot be expressed as a valid command.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BuildError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type for command building.
pub type BuildResult<T> = Result<T, BuildError>;

/// Build the gource argument list for `config` using the default executable.
pub fn build(config: &VisualizationConfig, repository_path: &Path) -> BuildResult<Vec<String>> {
    GourceOptionsBuilder::new(config, repository_path).build()
}
