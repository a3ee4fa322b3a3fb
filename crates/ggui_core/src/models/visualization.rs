//! Visualization and export option structures.
//!
//! These are plain values owned by the caller (the GUI or CLI layer). The
//! command builder and the supervisor only ever read them.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{CameraMode, ContainerFormat, QualityPreset};
use crate::command::format_decimal;

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are non-zero.
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::new(1280, 720)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("resolution '{}' is not WIDTHxHEIGHT", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in '{}'", s))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in '{}'", s))?;
        Ok(Resolution::new(width, height))
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// RGB colour, written as `#RRGGBB` in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hex digits without a leading `#`, as gource expects.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("colour '{}' is not #RRGGBB", s));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Elements that can be hidden with `--hide`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HideElements {
    pub filenames: bool,
    pub dirnames: bool,
    pub usernames: bool,
    pub bloom: bool,
    pub progress: bool,
    pub date: bool,
    pub mouse: bool,
}

impl HideElements {
    /// Names of the hidden elements, in the order gource documents them.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.filenames, "filenames"),
            (self.dirnames, "dirnames"),
            (self.usernames, "usernames"),
            (self.bloom, "bloom"),
            (self.progress, "progress"),
            (self.date, "date"),
            (self.mouse, "mouse"),
        ]
        .into_iter()
        .filter_map(|(hidden, name)| hidden.then_some(name))
        .collect()
    }

    /// Hide an element by its gource name. Returns false for unknown names.
    pub fn set(&mut self, name: &str) -> bool {
        self.set_hidden(name, true)
    }

    /// Show a previously hidden element. Returns false for unknown names.
    pub fn show(&mut self, name: &str) -> bool {
        self.set_hidden(name, false)
    }

    fn set_hidden(&mut self, name: &str, hidden: bool) -> bool {
        let slot = match name.trim() {
            "filenames" => &mut self.filenames,
            "dirnames" => &mut self.dirnames,
            "usernames" => &mut self.usernames,
            "bloom" => &mut self.bloom,
            "progress" => &mut self.progress,
            "date" => &mut self.date,
            "mouse" => &mut self.mouse,
            _ => return false,
        };
        *slot = hidden;
        true
    }
}

/// Optional bounds on the visualized history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// False only when both bounds are set and start is after end.
    pub fn is_ordered(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }
}

/// Options controlling a gource visualization.
///
/// Defaults match what gource does when the corresponding flag is absent,
/// except `resolution` and `seconds_per_day` which are always passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Window / frame size.
    pub resolution: Resolution,
    /// Simulated seconds per day of history.
    pub seconds_per_day: f64,
    /// Skip idle periods longer than this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_skip_seconds: Option<f64>,
    pub fullscreen: bool,
    pub multi_sampling: bool,
    pub background_color: Rgb,
    pub font_scale: f64,
    pub hide: HideElements,
    /// Show the file extension key.
    pub show_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Directory of `<username>.png` avatars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_image_dir: Option<PathBuf>,
    pub elasticity: f64,
    pub camera_mode: CameraMode,
    pub date_range: DateRange,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            seconds_per_day: 10.0,
            auto_skip_seconds: None,
            fullscreen: false,
            multi_sampling: false,
            background_color: Rgb::BLACK,
            font_scale: 1.0,
            hide: HideElements::default(),
            show_key: false,
            title: None,
            user_image_dir: None,
            elasticity: 0.0,
            camera_mode: CameraMode::Overview,
            date_range: DateRange::default(),
        }
    }
}

impl VisualizationConfig {
    /// Reject values gource cannot be given.
    ///
    /// `seconds_per_day` and `font_scale` must be positive and still
    /// non-zero after three-decimal formatting. `auto_skip_seconds` must
    /// not be negative.
    pub fn validate(&self) -> Result<(), String> {
        if !self.resolution.is_positive() {
            return Err(format!("resolution must be positive, got {}", self.resolution));
        }
        positive("seconds_per_day", self.seconds_per_day)?;
        positive("font_scale", self.font_scale)?;
        if let Some(skip) = self.auto_skip_seconds {
            if !skip.is_finite() || skip < 0.0 {
                return Err(format!("auto_skip_seconds must not be negative, got {}", skip));
            }
        }
        if !self.elasticity.is_finite() {
            return Err(format!("elasticity must be a number, got {}", self.elasticity));
        }
        if !self.date_range.is_ordered() {
            if let (Some(start), Some(end)) = (self.date_range.start, self.date_range.end) {
                return Err(format!("start date {} is after stop date {}", start, end));
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be positive, got {}", name, value));
    }
    if format_decimal(value) == "0.0" {
        return Err(format!("{} {} rounds to zero at 0.001 precision", name, value));
    }
    Ok(())
}

/// Frame rates gource can emit with `--output-framerate`.
pub const SUPPORTED_FRAMERATES: [u32; 3] = [25, 30, 60];

/// Encoder options for exporting a visualization to a video file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub framerate: u32,
    pub quality: QualityPreset,
    pub format: ContainerFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            framerate: 60,
            quality: QualityPreset::default(),
            format: ContainerFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_parses_and_displays() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(res, Resolution::new(1920, 1080));
        assert_eq!(res.to_string(), "1920x1080");
        assert!("1920".parse::<Resolution>().is_err());
        assert!(!Resolution::new(0, 720).is_positive());
    }

    #[test]
    fn rgb_round_trips_hex() {
        let c: Rgb = "#1a2B3c".parse().unwrap();
        assert_eq!(c, Rgb::new(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_hex(), "1A2B3C");
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn hide_names_keep_fixed_order() {
        let mut hide = HideElements::default();
        assert!(hide.set("progress"));
        assert!(hide.set("filenames"));
        assert!(!hide.set("everything"));
        assert_eq!(hide.names(), vec!["filenames", "progress"]);

        assert!(hide.show("progress"));
        assert!(!hide.show("everything"));
        assert_eq!(hide.names(), vec!["filenames"]);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(VisualizationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn seconds_per_day_must_be_positive() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY, 0.0004] {
            let config = VisualizationConfig {
                seconds_per_day: bad,
                ..VisualizationConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.contains("seconds_per_day"), "{}: {}", bad, err);
        }

        let smallest = VisualizationConfig {
            seconds_per_day: 0.001,
            ..VisualizationConfig::default()
        };
        assert_eq!(smallest.validate(), Ok(()));
    }

    #[test]
    fn font_scale_must_be_positive() {
        for bad in [0.0, -1.0, f64::NAN] {
            let config = VisualizationConfig {
                font_scale: bad,
                ..VisualizationConfig::default()
            };
            assert!(config.validate().unwrap_err().contains("font_scale"));
        }
    }

    #[test]
    fn auto_skip_must_not_be_negative() {
        let mut config = VisualizationConfig {
            auto_skip_seconds: Some(-1.0),
            ..VisualizationConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("auto_skip_seconds"));

        config.auto_skip_seconds = Some(0.0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn inverted_dates_are_invalid() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        let config = VisualizationConfig {
            date_range: DateRange::new(d("2022-01-01"), d("2021-01-01")),
            ..VisualizationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("2022-01-01"));
    }

    #[test]
    fn date_range_ordering() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        assert!(DateRange::new(d("2020-01-01"), d("2021-01-01")).is_ordered());
        assert!(DateRange::new(d("2020-01-01"), d("2020-01-01")).is_ordered());
        assert!(DateRange::new(d("2020-01-01"), None).is_ordered());
        assert!(!DateRange::new(d("2022-01-01"), d("2021-01-01")).is_ordered());
    }

    #[test]
    fn visualization_config_round_trips_through_toml() {
        let mut config = VisualizationConfig::default();
        config.background_color = Rgb::new(255, 0, 0);
        config.title = Some("My Project".into());
        config.hide.bloom = true;

        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("background_color = \"#FF0000\""));
        assert!(text.contains("resolution = \"1280x720\""));

        let back: VisualizationConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: VisualizationConfig = toml::from_str("seconds_per_day = 2.5\n").unwrap();
        assert_eq!(config.seconds_per_day, 2.5);
        assert_eq!(config.resolution, Resolution::default());
        assert_eq!(config.camera_mode, CameraMode::Overview);
    }
}
