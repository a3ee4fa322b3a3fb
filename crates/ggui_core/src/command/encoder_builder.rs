//! ffmpeg command builder for video export.
//!
//! gource writes a PPM image stream to stdout; ffmpeg reads it from stdin
//! and encodes it into the requested container.

use std::path::Path;

use super::{BuildError, BuildResult};
use crate::models::{ContainerFormat, ExportOptions, SUPPORTED_FRAMERATES};

/// Default ffmpeg executable name.
pub const FFMPEG_EXECUTABLE: &str = "ffmpeg";

/// Extra gource flags that switch it to raw-frame output on stdout.
pub fn export_stream_args(framerate: u32) -> Vec<String> {
    vec![
        "--output-ppm-stream".to_string(),
        "-".to_string(),
        "--output-framerate".to_string(),
        framerate.to_string(),
        "--stop-at-end".to_string(),
    ]
}

/// Builder for the encoder side of an export pipeline.
pub struct EncoderOptionsBuilder<'a> {
    options: &'a ExportOptions,
    output_path: &'a Path,
    executable: &'a str,
}

impl<'a> EncoderOptionsBuilder<'a> {
    /// Create a new builder writing to `output_path`.
    pub fn new(options: &'a ExportOptions, output_path: &'a Path) -> Self {
        Self {
            options,
            output_path,
            executable: FFMPEG_EXECUTABLE,
        }
    }

    /// Use a specific ffmpeg executable as the first token.
    pub fn executable(mut self, executable: &'a str) -> Self {
        self.executable = executable;
        self
    }

    /// Build the complete ffmpeg command tokens.
    pub fn build(&self) -> BuildResult<Vec<String>> {
        let options = self.options;
        if !SUPPORTED_FRAMERATES.contains(&options.framerate) {
            return Err(BuildError::invalid_config(format!(
                "framerate {} is not one of {:?}",
                options.framerate, SUPPORTED_FRAMERATES
            )));
        }

        let framerate = options.framerate.to_string();
        let mut tokens: Vec<String> = [
            self.executable,
            "-y",
            "-r",
            framerate.as_str(),
            "-f",
            "image2pipe",
            "-vcodec",
            "ppm",
            "-i",
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let crf = options.quality.crf().to_string();
        match options.format {
            ContainerFormat::WebM => {
                tokens.extend(
                    ["-vcodec", "libvpx-vp9", "-crf", crf.as_str(), "-b:v", "0", "-pix_fmt", "yuv420p"]
                        .iter()
                        .map(|s| s.to_string()),
                );
            }
            format => {
                tokens.extend(
                    [
                        "-vcodec",
                        "libx264",
                        "-preset",
                        options.quality.speed(),
                        "-crf",
                        crf.as_str(),
                        "-pix_fmt",
                        "yuv420p",
                    ]
                    .iter()
                    .map(|s| s.to_string()),
                );
                if matches!(format, ContainerFormat::Mp4 | ContainerFormat::Mov) {
                    tokens.push("-movflags".to_string());
                    tokens.push("+faststart".to_string());
                }
            }
        }

        tokens.push(self.output_path.to_string_lossy().to_string());
        Ok(tokens)
    }
}
