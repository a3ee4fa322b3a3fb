//! Data models for Gource GUI.
//!
//! This module contains the core data structures shared by the validator,
//! the command builder and the supervisor:
//! - Enums for VCS kinds, camera modes, export presets and run status
//! - Repository summaries
//! - Visualization and export options

mod enums;
mod repository;
mod visualization;

// Re-export all public types
pub use enums::{CameraMode, ContainerFormat, QualityPreset, RunStatus, VcsKind};
pub use repository::RepositoryInfo;
pub use visualization::{
    DateRange, ExportOptions, HideElements, Resolution, Rgb, VisualizationConfig,
    SUPPORTED_FRAMERATES,
};
