//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Kind of version-control system found in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Svn,
    Mercurial,
    Bazaar,
    Cvs,
    /// No recognized VCS metadata.
    Invalid,
}

impl VcsKind {
    /// Detection precedence when more than one marker is present.
    pub const DETECTION_ORDER: [VcsKind; 5] = [
        VcsKind::Git,
        VcsKind::Mercurial,
        VcsKind::Svn,
        VcsKind::Bazaar,
        VcsKind::Cvs,
    ];

    /// Name of the metadata entry that marks a repository root.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            VcsKind::Git => Some(".git"),
            VcsKind::Mercurial => Some(".hg"),
            VcsKind::Svn => Some(".svn"),
            VcsKind::Bazaar => Some(".bzr"),
            VcsKind::Cvs => Some("CVS"),
            VcsKind::Invalid => None,
        }
    }

    /// Command-line tool used to inspect this kind of repository.
    pub fn tool(&self) -> Option<&'static str> {
        match self {
            VcsKind::Git => Some("git"),
            VcsKind::Mercurial => Some("hg"),
            VcsKind::Svn => Some("svn"),
            VcsKind::Bazaar => Some("bzr"),
            VcsKind::Cvs => Some("cvs"),
            VcsKind::Invalid => None,
        }
    }

    /// Whether this is a recognized repository.
    pub fn is_valid(&self) -> bool {
        *self != VcsKind::Invalid
    }
}

impl std::fmt::Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VcsKind::Git => write!(f, "Git"),
            VcsKind::Svn => write!(f, "Subversion"),
            VcsKind::Mercurial => write!(f, "Mercurial"),
            VcsKind::Bazaar => write!(f, "Bazaar"),
            VcsKind::Cvs => write!(f, "CVS"),
            VcsKind::Invalid => write!(f, "Invalid"),
        }
    }
}

/// Gource camera mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// Keep the whole tree in view (tool default).
    #[default]
    Overview,
    /// Follow the active users.
    Track,
}

impl CameraMode {
    /// Value passed to `--camera-mode`.
    pub fn as_arg(&self) -> &'static str {
        match self {
            CameraMode::Overview => "overview",
            CameraMode::Track => "track",
        }
    }
}

impl std::fmt::Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl std::str::FromStr for CameraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overview" => Ok(CameraMode::Overview),
            "track" => Ok(CameraMode::Track),
            other => Err(format!("unknown camera mode '{}'", other)),
        }
    }
}

/// Encoder quality preset for video export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    /// CRF 15, slow preset.
    UltraHigh,
    /// CRF 18, medium preset.
    #[default]
    High,
    /// CRF 23, medium preset.
    Medium,
    /// CRF 28, fast preset.
    Low,
}

impl QualityPreset {
    /// Constant rate factor passed to the encoder.
    pub fn crf(&self) -> u8 {
        match self {
            QualityPreset::UltraHigh => 15,
            QualityPreset::High => 18,
            QualityPreset::Medium => 23,
            QualityPreset::Low => 28,
        }
    }

    /// x264 speed preset.
    pub fn speed(&self) -> &'static str {
        match self {
            QualityPreset::UltraHigh => "slow",
            QualityPreset::High | QualityPreset::Medium => "medium",
            QualityPreset::Low => "fast",
        }
    }
}

impl std::fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityPreset::UltraHigh => write!(f, "Ultra High (CRF 15)"),
            QualityPreset::High => write!(f, "High (CRF 18)"),
            QualityPreset::Medium => write!(f, "Medium (CRF 23)"),
            QualityPreset::Low => write!(f, "Low (CRF 28)"),
        }
    }
}

impl std::str::FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "ultra_high" | "ultra" => Ok(QualityPreset::UltraHigh),
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            "low" => Ok(QualityPreset::Low),
            other => Err(format!("unknown quality preset '{}'", other)),
        }
    }
}

/// Output container for exported videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// MP4 (H.264).
    #[default]
    Mp4,
    /// MOV (QuickTime).
    Mov,
    Avi,
    /// WebM (VP9).
    WebM,
}

impl ContainerFormat {
    /// All supported formats, in menu order.
    pub const ALL: [ContainerFormat; 4] = [
        ContainerFormat::Mp4,
        ContainerFormat::Mov,
        ContainerFormat::Avi,
        ContainerFormat::WebM,
    ];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Avi => "avi",
            ContainerFormat::WebM => "webm",
        }
    }

    /// Guess the container from an output file name.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerFormat::Mp4 => write!(f, "MP4 (H.264)"),
            ContainerFormat::Mov => write!(f, "MOV (QuickTime)"),
            ContainerFormat::Avi => write!(f, "AVI"),
            ContainerFormat::WebM => write!(f, "WebM"),
        }
    }
}

/// Status of a supervised run.
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// Process exited cleanly with this code.
    Completed(i32),
    /// Process started but exited with an error, crashed, or was stopped early.
    Failed(String),
}

impl RunStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed(code) => write!(f, "completed (exit code {})", code),
            RunStatus::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn detection_order_is_git_first() {
        assert_eq!(VcsKind::DETECTION_ORDER[0], VcsKind::Git);
        assert_eq!(VcsKind::DETECTION_ORDER[4], VcsKind::Cvs);
        assert!(VcsKind::DETECTION_ORDER.iter().all(|k| k.marker().is_some()));
    }

    #[test]
    fn quality_presets_map_to_encoder_values() {
        assert_eq!(QualityPreset::High.crf(), 18);
        assert_eq!(QualityPreset::UltraHigh.speed(), "slow");
        assert_eq!("ultra-high".parse::<QualityPreset>(), Ok(QualityPreset::UltraHigh));
        assert!("extreme".parse::<QualityPreset>().is_err());
    }

    #[test]
    fn container_from_path_ignores_case() {
        assert_eq!(
            ContainerFormat::from_path(Path::new("/tmp/out.WEBM")),
            Some(ContainerFormat::WebM)
        );
        assert_eq!(ContainerFormat::from_path(Path::new("/tmp/out.gif")), None);
    }

    #[test]
    fn run_status_terminality() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed(0).is_terminal());
        assert!(RunStatus::Failed("boom".into()).is_terminal());
    }
}
