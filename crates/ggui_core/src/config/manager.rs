//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Missing keys are filled with defaults and written back on load
//! - Preserves comments and formatting of other sections with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{resolve_logs_folder, ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Changes stay in memory until `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate().map_err(ConfigError::Invalid)?;
        self.settings = settings;
        Ok(())
    }

    /// Load config from file, creating with defaults if it doesn't exist.
    ///
    /// Also fills in missing keys, saving if anything changed. Settings
    /// with invalid values are rejected and the file is left untouched.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_and_check(&content)?;
            settings.validate().map_err(ConfigError::Invalid)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!("Rewriting config {} with defaults", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Logs folder, resolved relative to the config file's directory.
    pub fn logs_folder(&self) -> PathBuf {
        let base = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        resolve_logs_folder(&self.settings.paths, &base)
    }

    /// Parse content and report whether it differs from the normalized form.
    fn parse_and_check(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse()?;

        // Missing fields take their defaults here
        let settings: Settings = toml::from_str(content)?;

        let has_unknown = doc.iter().any(|(key, _)| {
            !ConfigSection::ALL
                .iter()
                .any(|section| section.table_name() == key)
        });
        let has_missing = ConfigSection::ALL
            .iter()
            .any(|section| !doc.contains_key(section.table_name()));

        // Re-serializing each section reveals missing keys within a section
        let mut missing_keys = false;
        for section in ConfigSection::ALL {
            let Some(existing) = doc.get(section.table_name()).and_then(Item::as_table) else {
                continue;
            };
            let normalized: DocumentMut = self.section_toml(section)?.parse()?;
            if normalized
                .iter()
                .any(|(key, _)| !existing.contains_key(key))
            {
                missing_keys = true;
                break;
            }
        }

        Ok((settings, has_unknown || has_missing || missing_keys))
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the given section, and
    /// writes back atomically so other sections keep their on-disk state.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = self.section_toml(section)?.parse()?;
        let section_table = section_doc.as_table().clone();

        doc[section.table_name()] = Item::Table(section_table);

        self.atomic_write(&doc.to_string())?;

        Ok(())
    }

    /// Serialize one section's contents (without the table header).
    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let text = match section {
            ConfigSection::Window => toml::to_string_pretty(&s.window)?,
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Visualization => toml::to_string_pretty(&s.visualization)?,
            ConfigSection::Export => toml::to_string_pretty(&s.export)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
        };
        Ok(text)
    }

    /// Generate config content with helpful comments.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut doc: DocumentMut = toml::to_string_pretty(&self.settings)?.parse()?;
        for section in ConfigSection::ALL {
            if let Some(table) = doc
                .get_mut(section.table_name())
                .and_then(Item::as_table_mut)
            {
                table
                    .decor_mut()
                    .set_prefix(format!("\n# {}\n", section.description()));
            }
        }

        let mut output = String::new();
        output.push_str("# Gource GUI Configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );
        output.push_str(&doc.to_string());
        Ok(output)
    }

    /// Write content to config file atomically.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Temp file in same directory (for atomic rename)
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}
