/// Application settings
///
/// A JSON document with the default generation parameters and a few
/// application values (cache location and size, tool path, last used
/// folders). Whatever the user file leaves out falls back to the defaults.
///
/// The document is stored in the user's config directory:
/// - Linux: ~/.config/astscript-color-faint-gray/config.json
/// - macOS: ~/Library/Application Support/astscript-color-faint-gray/config.json
/// - Windows: %APPDATA%\astscript-color-faint-gray\config.json

use crate::cache::{CacheConfig, DEFAULT_MAX_ENTRIES};
use crate::error::SettingsError;
use crate::params::command::DEFAULT_PROGRAM;
use crate::params::{default_parameters, CommandBuilder, ParamValue, Parameters};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder name under the platform config and cache directories
pub const APP_DIR: &str = "astscript-color-faint-gray";

const SETTINGS_FILE: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Default generation parameters; user values override or extend them
    pub parameters: Parameters,
    pub app: AppSettings,
    /// Sections this crate does not use (window layout and the like), kept
    /// so that saving does not lose them
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Maximum number of cached images
    pub cache_size: usize,
    pub cache_dir: PathBuf,
    /// Extension of generated images (without the dot)
    pub default_output_format: String,
    pub astscript_path: String,
    pub last_input_dir: Option<PathBuf>,
    pub last_output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parameters: default_parameters(),
            app: AppSettings::default(),
            extra: serde_json::Map::new(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_MAX_ENTRIES,
            cache_dir: default_cache_dir(),
            default_output_format: "tif".to_string(),
            astscript_path: DEFAULT_PROGRAM.to_string(),
            last_input_dir: dirs::home_dir(),
            last_output_dir: dirs::home_dir(),
        }
    }
}

/// `<user cache dir>/astscript-color-faint-gray`, or `./cache` without one
pub fn default_cache_dir() -> PathBuf {
    match dirs_next::cache_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => PathBuf::from("cache"),
    }
}

impl Settings {
    /// Location of the settings document for this user
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load settings, falling back to defaults
    ///
    /// A missing file gives the defaults silently; an unreadable or corrupt
    /// one is logged and also gives the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        let mut document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text)?;

        // Parameters are merged one by one so a single bad value only loses itself
        let user_parameters = document.remove("parameters");
        let mut settings: Settings = serde_json::from_value(serde_json::Value::Object(document))?;

        match user_parameters {
            Some(serde_json::Value::Object(user)) => {
                for (name, value) in user {
                    match ParamValue::from_json(&value) {
                        Some(value) => {
                            settings.parameters.insert(name, value);
                        }
                        None => tracing::warn!(
                            "Ignoring non-scalar parameter '{}' in {}",
                            name,
                            path.display()
                        ),
                    }
                }
            }
            Some(other) => tracing::warn!(
                "Ignoring parameters section in {}: expected an object, found {}",
                path.display(),
                other
            ),
            None => {}
        }

        Ok(settings)
    }

    /// Write the document, creating its folder if needed
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Restore the default generation parameters
    pub fn reset_parameters(&mut self) {
        self.parameters = default_parameters();
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(&self.app.cache_dir).with_max_entries(self.app.cache_size)
    }

    pub fn command_builder(&self) -> CommandBuilder {
        CommandBuilder::new(&self.app.astscript_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("config.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.app.cache_size, 25);
    }

    #[test]
    fn test_partial_file_is_merged_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "parameters": {"qbright": 20.0, "future_knob": "x"},
                "app": {"cache_size": 10},
                "ui": {"theme": "dark"}
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.parameters["qbright"], ParamValue::Float(20.0));
        assert_eq!(settings.parameters["gamma"], ParamValue::Float(0.5));
        assert_eq!(settings.parameters["future_knob"], ParamValue::Text("x".into()));
        assert_eq!(settings.app.cache_size, 10);
        assert_eq!(settings.app.astscript_path, "astscript-color-faint-gray");
        assert_eq!(settings.cache_config().max_entries, 10);
        assert_eq!(settings.extra["ui"]["theme"], "dark");
    }

    #[test]
    fn test_non_scalar_parameter_only_loses_itself() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"parameters": {"qbright": 20.0, "weight": ["w1.fits", "w2.fits"]}, "app": {"cache_size": 7}}"#,
        )
        .unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.parameters["qbright"], ParamValue::Float(20.0));
        assert_eq!(settings.parameters["weight"], ParamValue::Null);
        assert_eq!(settings.app.cache_size, 7);
    }

    #[test]
    fn test_unknown_sections_survive_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"ui": {"window_width": 1400, "theme": "dark"}}"#).unwrap();

        let mut settings = Settings::load(&path);
        settings.app.cache_size = 12;
        settings.save(&path).unwrap();

        let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["ui"]["window_width"], 1400);
        assert_eq!(doc["app"]["cache_size"], 12);
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json at all").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.app.cache_dir = dir.path().join("cache");
        settings.app.astscript_path = "/opt/gnuastro/bin/astscript-color-faint-gray".into();
        settings
            .parameters
            .insert("contrast".into(), ParamValue::Float(6.0));
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.command_builder().program(), "/opt/gnuastro/bin/astscript-color-faint-gray");
        assert_eq!(loaded.cache_config().base_dir, dir.path().join("cache"));

        let mut reset = loaded.clone();
        reset.reset_parameters();
        assert_eq!(reset.parameters, default_parameters());
    }
}
