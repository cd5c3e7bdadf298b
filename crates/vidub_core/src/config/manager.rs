//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Validation on load (unknown sections and missing defaults trigger a rewrite)
//! - Preserves comments in untouched sections with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

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
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for the given file. Call `load()` or
    /// `load_or_create()` afterwards.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes stay in memory until `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file; errors if it does not exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    ///
    /// An existing file with unknown sections or missing keys is rewritten
    /// with the full set of defaults.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::info!("Rewriting config {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Create the output and logs directories if they don't exist.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let mut dirs = vec![self.settings.logs_folder()];
        if let Some(output) = self.settings.output_folder() {
            dirs.push(output);
        }

        for dir in dirs {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Parse content and report whether it needs rewriting.
    fn parse_validate_and_clean(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let raw: toml::Table = toml::from_str(content)?;
        let settings: Settings = toml::from_str(content)?;

        let valid_sections: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        let has_unknown = raw.keys().any(|key| !valid_sections.contains(&key.as_str()));

        let missing = match toml::Value::try_from(&settings)? {
            toml::Value::Table(full) => has_missing_keys(&raw, &full),
            _ => false,
        };

        Ok((settings, has_unknown || missing))
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the given table, and
    /// writes back atomically. Other sections keep their on-disk content.
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

        let section_toml = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
            ConfigSection::Pipeline => toml::to_string_pretty(&self.settings.pipeline)?,
            ConfigSection::Audio => toml::to_string_pretty(&self.settings.audio)?,
            ConfigSection::Voices => toml::to_string_pretty(&self.settings.voices)?,
            ConfigSection::Subtitle => toml::to_string_pretty(&self.settings.subtitle)?,
        };

        let section_doc: DocumentMut = section_toml.parse()?;
        let section_table = section_doc.as_table().clone();

        doc[section.table_name()] = Item::Table(section_table);

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Video dubbing pipeline configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n\n",
        );

        for section in ConfigSection::ALL {
            let body = match section {
                ConfigSection::Paths => section_toml(section, &self.settings.paths)?,
                ConfigSection::Logging => section_toml(section, &self.settings.logging)?,
                ConfigSection::Pipeline => section_toml(section, &self.settings.pipeline)?,
                ConfigSection::Audio => section_toml(section, &self.settings.audio)?,
                ConfigSection::Voices => section_toml(section, &self.settings.voices)?,
                ConfigSection::Subtitle => section_toml(section, &self.settings.subtitle)?,
            };
            output.push_str(&format!("# {}\n", section.description()));
            output.push_str(body.trim_end());
            output.push_str("\n\n");
        }

        Ok(output)
    }

    /// Write content to a temp file in the same directory, then rename.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

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

/// Render one section under its own table header, nested tables included.
fn section_toml<T: Serialize>(section: ConfigSection, value: &T) -> ConfigResult<String> {
    let mut table = toml::Table::new();
    table.insert(section.table_name().to_string(), toml::Value::try_from(value)?);
    Ok(toml::to_string_pretty(&table)?)
}

/// Whether `full` has a key (at any table depth) that `raw` lacks.
fn has_missing_keys(raw: &toml::Table, full: &toml::Table) -> bool {
    full.iter().any(|(key, full_value)| match raw.get(key) {
        None => true,
        Some(toml::Value::Table(raw_table)) => match full_value {
            toml::Value::Table(full_table) if key_is_struct(key) => {
                has_missing_keys(raw_table, full_table)
            }
            _ => false,
        },
        Some(_) => false,
    })
}

/// Map-valued tables (like `voices.languages`) may legitimately drop keys.
fn key_is_struct(key: &str) -> bool {
    key != "languages"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[logging]"));
        assert!(content.contains("[voices.languages]"));
        assert!(content.contains("# Pipeline behaviour"));

        // The generated file parses back to the defaults.
        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().voices.voice_for("de"), "de-DE-ConradNeural");
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        fs::write(&config_path, "[paths]\noutput_folder = \"my_custom_folder\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.output_folder, "my_custom_folder");
        // Missing sections were filled in on disk.
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("my_custom_folder"));
        assert!(content.contains("[pipeline]"));
    }

    #[test]
    fn complete_file_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();
        let mut content = fs::read_to_string(&config_path).unwrap();
        content.push_str("# user note\n");
        fs::write(&config_path, &content).unwrap();

        manager.load_or_create().unwrap();
        assert!(fs::read_to_string(&config_path).unwrap().contains("# user note"));
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("none.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().logging.compact = false;
        manager.settings_mut().pipeline.synthesis_workers = 9;
        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(content.contains("synthesis_workers = 4"));
        assert!(content.contains("[paths]"));
    }

    #[test]
    fn ensure_dirs_creates_configured_folders() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("settings.toml"));
        manager.settings_mut().paths.logs_folder = dir.path().join("logs").to_string_lossy().to_string();
        manager.settings_mut().paths.output_folder = dir.path().join("out").to_string_lossy().to_string();

        manager.ensure_dirs_exist().unwrap();

        assert!(dir.path().join("logs").is_dir());
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(!config_path.with_extension("toml.tmp").exists());
    }
}
