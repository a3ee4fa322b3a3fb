//! Error types for process supervision.
//!
//! Launch problems are reported synchronously as `SupervisorError`; anything
//! that goes wrong after a successful spawn ends up in `RunStatus::Failed`.

use std::io;

use thiserror::Error;

use crate::command::BuildError;

/// Errors raised while starting a run.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The executable could not be found or failed to spawn.
    #[error("Failed to launch '{tool}': {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// No executable was given.
    #[error("Cannot start an empty command")]
    EmptyCommand,

    /// The export command could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// I/O error while setting up the run.
    #[error("Process I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SupervisorError {
    /// Create a launch error.
    pub fn launch(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            tool: tool.into(),
            source,
        }
    }

    /// Whether the executable itself was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Launch { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
