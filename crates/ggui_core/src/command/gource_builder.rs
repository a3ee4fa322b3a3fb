//! gource command options builder.
//!
//! Builds command-line tokens for gource from a `VisualizationConfig`.
//!
//! # Token order
//!
//! The order is fixed so that a previewed command is exactly the command
//! that runs:
//!
//! 1. executable, repository path
//! 2. display: `--fullscreen`, `--multi-sampling`, `--background-colour`, `--font-scale`
//! 3. visual: `--hide`, `--key`, `--title`, `--user-image-dir`, `--elasticity`
//! 4. camera/date: `--camera-mode`, `--seconds-per-day`, `--auto-skip-seconds`,
//!    `--start-date`, `--stop-date`
//! 5. resolution/output: `--viewport`
//!
//! Flags whose value equals the gource default are omitted, except
//! `--seconds-per-day` and `--viewport` which are always present.

use std::path::Path;

use super::{BuildError, BuildResult};
use crate::models::{CameraMode, Rgb, VisualizationConfig};

/// Default gource executable name.
pub const GOURCE_EXECUTABLE: &str = "gource";

/// Date format gource accepts for `--start-date` / `--stop-date`.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builder for gource command-line options.
pub struct GourceOptionsBuilder<'a> {
    config: &'a VisualizationConfig,
    repository_path: &'a Path,
    executable: &'a str,
}

impl<'a> GourceOptionsBuilder<'a> {
    /// Create a new options builder using the `gource` found on PATH.
    pub fn new(config: &'a VisualizationConfig, repository_path: &'a Path) -> Self {
        Self {
            config,
            repository_path,
            executable: GOURCE_EXECUTABLE,
        }
    }

    /// Use a specific gource executable as the first token.
    pub fn executable(mut self, executable: &'a str) -> Self {
        self.executable = executable;
        self
    }

    /// Check the fields this builder is responsible for.
    ///
    /// Other fields are checked by `VisualizationConfig::validate` when the
    /// settings are loaded or edited.
    pub fn validate(&self) -> BuildResult<()> {
        let config = self.config;
        if !config.resolution.is_positive() {
            return Err(BuildError::invalid_config(format!(
                "resolution must be positive, got {}",
                config.resolution
            )));
        }
        if !config.date_range.is_ordered() {
            if let (Some(start), Some(end)) = (config.date_range.start, config.date_range.end) {
                return Err(BuildError::invalid_config(format!(
                    "start date {} is after stop date {}",
                    start.format(DATE_FORMAT),
                    end.format(DATE_FORMAT)
                )));
            }
        }
        Ok(())
    }

    /// Build the complete gource command tokens.
    pub fn build(&self) -> BuildResult<Vec<String>> {
        self.validate()?;

        let mut tokens = vec![
            self.executable.to_string(),
            self.repository_path.to_string_lossy().to_string(),
        ];

        self.add_display_options(&mut tokens);
        self.add_visual_options(&mut tokens);
        self.add_camera_and_date_options(&mut tokens);
        self.add_resolution_options(&mut tokens);

        Ok(tokens)
    }

    fn add_display_options(&self, tokens: &mut Vec<String>) {
        let config = self.config;

        if config.fullscreen {
            tokens.push("--fullscreen".to_string());
        }
        if config.multi_sampling {
            tokens.push("--multi-sampling".to_string());
        }
        if config.background_color != Rgb::BLACK {
            tokens.push("--background-colour".to_string());
            tokens.push(config.background_color.to_hex());
        }
        if config.font_scale != 1.0 {
            tokens.push("--font-scale".to_string());
            tokens.push(format_decimal(config.font_scale));
        }
    }

    fn add_visual_options(&self, tokens: &mut Vec<String>) {
        let config = self.config;

        let hidden = config.hide.names();
        if !hidden.is_empty() {
            tokens.push("--hide".to_string());
            tokens.push(hidden.join(","));
        }
        if config.show_key {
            tokens.push("--key".to_string());
        }
        if let Some(title) = config.title.as_deref().filter(|t| !t.trim().is_empty()) {
            tokens.push("--title".to_string());
            tokens.push(title.to_string());
        }
        if let Some(ref dir) = config.user_image_dir {
            tokens.push("--user-image-dir".to_string());
            tokens.push(dir.to_string_lossy().to_string());
        }
        if config.elasticity != 0.0 {
            tokens.push("--elasticity".to_string());
            tokens.push(format_decimal(config.elasticity));
        }
    }

    fn add_camera_and_date_options(&self, tokens: &mut Vec<String>) {
        let config = self.config;

        if config.camera_mode != CameraMode::Overview {
            tokens.push("--camera-mode".to_string());
            tokens.push(config.camera_mode.as_arg().to_string());
        }

        tokens.push("--seconds-per-day".to_string());
        tokens.push(format_decimal(config.seconds_per_day));

        if let Some(skip) = config.auto_skip_seconds {
            tokens.push("--auto-skip-seconds".to_string());
            tokens.push(format_decimal(skip));
        }
        if let Some(start) = config.date_range.start {
            tokens.push("--start-date".to_string());
            tokens.push(start.format(DATE_FORMAT).to_string());
        }
        if let Some(end) = config.date_range.end {
            tokens.push("--stop-date".to_string());
            tokens.push(end.format(DATE_FORMAT).to_string());
        }
    }

    fn add_resolution_options(&self, tokens: &mut Vec<String>) {
        tokens.push("--viewport".to_string());
        tokens.push(self.config.resolution.to_string());
    }
}

/// Format a decimal option value independently of locale.
///
/// At least one and at most three decimal places, trailing zeros trimmed:
/// `1.0`, `0.5`, `0.25`, `0.125`.
pub fn format_decimal(value: f64) -> String {
    let mut text = format!("{:.3}", value);
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, Resolution};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn minimal_config() -> VisualizationConfig {
        VisualizationConfig {
            resolution: Resolution::new(1280, 720),
            seconds_per_day: 1.0,
            ..VisualizationConfig::default()
        }
    }

    #[test]
    fn minimal_config_emits_only_required_tokens() {
        let config = minimal_config();
        let tokens = GourceOptionsBuilder::new(&config, Path::new("/repos/widget"))
            .build()
            .unwrap();

        assert_eq!(
            tokens,
            vec![
                "gource",
                "/repos/widget",
                "--seconds-per-day",
                "1.0",
                "--viewport",
                "1280x720",
            ]
        );
    }

    #[test]
    fn build_is_deterministic() {
        let mut config = minimal_config();
        config.hide.usernames = true;
        config.title = Some("Widget".into());
        let path = Path::new("/repos/widget");

        let first = GourceOptionsBuilder::new(&config, path).build().unwrap();
        let second = GourceOptionsBuilder::new(&config, path).build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn full_config_keeps_group_order() {
        let config = VisualizationConfig {
            resolution: Resolution::new(1920, 1080),
            seconds_per_day: 0.25,
            auto_skip_seconds: Some(1.5),
            fullscreen: true,
            multi_sampling: true,
            background_color: Rgb::new(0x10, 0x20, 0x30),
            font_scale: 1.5,
            hide: crate::models::HideElements {
                filenames: true,
                bloom: true,
                ..Default::default()
            },
            show_key: true,
            title: Some("Widget history".into()),
            user_image_dir: Some("/avatars".into()),
            elasticity: 0.1,
            camera_mode: CameraMode::Track,
            date_range: DateRange::new(Some(date("2020-01-01")), Some(date("2021-06-30"))),
        };

        let tokens = GourceOptionsBuilder::new(&config, Path::new("/r"))
            .executable("/opt/gource/bin/gource")
            .build()
            .unwrap();

        assert_eq!(
            tokens,
            vec![
                "/opt/gource/bin/gource",
                "/r",
                "--fullscreen",
                "--multi-sampling",
                "--background-colour",
                "102030",
                "--font-scale",
                "1.5",
                "--hide",
                "filenames,bloom",
                "--key",
                "--title",
                "Widget history",
                "--user-image-dir",
                "/avatars",
                "--elasticity",
                "0.1",
                "--camera-mode",
                "track",
                "--seconds-per-day",
                "0.25",
                "--auto-skip-seconds",
                "1.5",
                "--start-date",
                "2020-01-01",
                "--stop-date",
                "2021-06-30",
                "--viewport",
                "1920x1080",
            ]
        );
    }

    #[test]
    fn rejects_inverted_date_range() {
        let mut config = minimal_config();
        config.date_range = DateRange::new(Some(date("2022-01-01")), Some(date("2021-01-01")));

        let err = GourceOptionsBuilder::new(&config, Path::new("/r"))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
        assert!(err.to_string().contains("2022-01-01"));
    }

    #[test]
    fn rejects_zero_resolution() {
        let mut config = minimal_config();
        config.resolution = Resolution::new(1280, 0);

        let err = GourceOptionsBuilder::new(&config, Path::new("/r"))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }

    #[test]
    fn single_date_bound_is_allowed() {
        let mut config = minimal_config();
        config.date_range = DateRange::new(None, Some(date("2021-01-01")));

        let tokens = GourceOptionsBuilder::new(&config, Path::new("/r"))
            .build()
            .unwrap();
        assert!(tokens.windows(2).any(|w| w == ["--stop-date", "2021-01-01"]));
        assert!(!tokens.contains(&"--start-date".to_string()));
    }

    #[test]
    fn blank_title_is_skipped() {
        let mut config = minimal_config();
        config.title = Some("   ".into());

        let tokens = GourceOptionsBuilder::new(&config, Path::new("/r"))
            .build()
            .unwrap();
        assert!(!tokens.contains(&"--title".to_string()));
    }

    #[test]
    fn decimal_formatting_policy() {
        assert_eq!(format_decimal(1.0), "1.0");
        assert_eq!(format_decimal(10.0), "10.0");
        assert_eq!(format_decimal(0.5), "0.5");
        assert_eq!(format_decimal(0.25), "0.25");
        assert_eq!(format_decimal(0.125), "0.125");
        assert_eq!(format_decimal(0.33333), "0.333");
    }
}
