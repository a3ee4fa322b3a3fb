//! External tool discovery.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ToolSettings;

/// External programs the application drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Gource,
    Ffmpeg,
    Git,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Gource, Tool::Ffmpeg, Tool::Git];

    /// Executable name looked up on PATH.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Gource => "gource",
            Tool::Ffmpeg => "ffmpeg",
            Tool::Git => "git",
        }
    }

    /// What the application loses without this tool.
    pub fn purpose(&self) -> &'static str {
        match self {
            Tool::Gource => "required for visualization",
            Tool::Ffmpeg => "required for video export",
            Tool::Git => "used for repository metadata",
        }
    }

    fn configured<'a>(&self, tools: &'a ToolSettings) -> &'a str {
        match self {
            Tool::Gource => tools.gource(),
            Tool::Ffmpeg => tools.ffmpeg(),
            Tool::Git => tools.git(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Search `PATH` for an executable named `tool`.
pub fn find_in_path(tool: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let full = dir.join(tool);
        if full.is_file() {
            return Some(full);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{tool}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

/// Resolve a configured tool: paths are checked directly, bare names on PATH.
pub fn resolve_tool(configured: &str) -> Option<PathBuf> {
    let candidate = Path::new(configured);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        candidate.is_file().then(|| candidate.to_path_buf())
    } else {
        find_in_path(configured)
    }
}

/// Where each tool was found, if anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    pub gource: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub git: Option<PathBuf>,
}

impl ToolReport {
    /// Location of `tool`, if found.
    pub fn location(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Gource => self.gource.as_deref(),
            Tool::Ffmpeg => self.ffmpeg.as_deref(),
            Tool::Git => self.git.as_deref(),
        }
    }

    pub fn is_available(&self, tool: Tool) -> bool {
        self.location(tool).is_some()
    }

    /// Tools that could not be found.
    pub fn missing(&self) -> Vec<Tool> {
        Tool::ALL
            .into_iter()
            .filter(|t| !self.is_available(*t))
            .collect()
    }

    /// Whether a visualization can be started.
    pub fn can_visualize(&self) -> bool {
        self.is_available(Tool::Gource)
    }

    /// Whether a video export can be started.
    pub fn can_export(&self) -> bool {
        self.is_available(Tool::Gource) && self.is_available(Tool::Ffmpeg)
    }
}

/// Check which tools are available, honouring configured paths.
pub fn check_tools(tools: &ToolSettings) -> ToolReport {
    let report = ToolReport {
        gource: resolve_tool(Tool::Gource.configured(tools)),
        ffmpeg: resolve_tool(Tool::Ffmpeg.configured(tools)),
        git: resolve_tool(Tool::Git.configured(tools)),
    };
    for tool in report.missing() {
        tracing::warn!("{} not found ({})", tool, tool.purpose());
    }
    report
}

/// Platform-specific hints for installing `tool`.
pub fn install_instructions(tool: Tool) -> String {
    let name = tool.name();
    let (site, windows) = match tool {
        Tool::Gource => ("https://gource.io", "https://gource.io/downloads/"),
        Tool::Ffmpeg => ("https://ffmpeg.org", "https://ffmpeg.org/download.html"),
        Tool::Git => ("https://git-scm.com", "https://git-scm.com/download/win"),
    };

    if cfg!(target_os = "macos") {
        format!(
            "To install {name} on macOS:\n  brew install {name}\n  sudo port install {name}\nOr download from {site}"
        )
    } else if cfg!(windows) {
        format!("To install {name} on Windows:\n  Download from {windows}\n  choco install {name}")
    } else {
        format!(
            "To install {name} on Linux:\n  Ubuntu/Debian: sudo apt-get install {name}\n  Fedora/RHEL:   sudo dnf install {name}\n  Arch Linux:    sudo pacman -S {name}\nOr build from source: {site}"
        )
    }
}
