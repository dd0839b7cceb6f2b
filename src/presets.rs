/// Parameter presets
///
/// Named parameter sets saved one per file under `<config dir>/presets/`.
/// The file name comes from the preset name, lowercased with spaces turned
/// into underscores, so `Deep Field` and `deep field` are the same preset.

use crate::cache::policy::now_timestamp;
use crate::error::SettingsError;
use crate::params::Parameters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PRESETS_DIR: &str = "presets";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// When the preset was saved
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub parameters: Parameters,
}

#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

/// `Deep Field` becomes `deep_field.json`
pub fn preset_file_name(name: &str) -> Result<String, SettingsError> {
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(SettingsError::InvalidPresetName(name.to_string()));
    }
    Ok(format!("{}.json", name.replace(' ', "_").to_lowercase()))
}

impl PresetStore {
    /// Presets kept in `config_dir`, creating the folder if needed
    pub fn open(config_dir: &Path) -> Result<Self, SettingsError> {
        let dir = config_dir.join(PRESETS_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save (or overwrite) a preset. Returns the file written.
    pub fn save(
        &self,
        name: &str,
        parameters: &Parameters,
        description: &str,
    ) -> Result<PathBuf, SettingsError> {
        let path = self.dir.join(preset_file_name(name)?);
        let preset = Preset {
            name: name.trim().to_string(),
            description: description.to_string(),
            created: now_timestamp(),
            parameters: parameters.clone(),
        };
        fs::write(&path, serde_json::to_string_pretty(&preset)?)?;

        tracing::debug!("Saved preset '{}' to {}", preset.name, path.display());
        Ok(path)
    }

    /// Look a preset up by name. Unknown, invalid and unreadable presets
    /// all give `None`; the last is logged.
    pub fn load(&self, name: &str) -> Option<Preset> {
        let path = self.dir.join(preset_file_name(name).ok()?);
        if !path.exists() {
            return None;
        }
        match read_preset(&path) {
            Ok(preset) => Some(preset),
            Err(e) => {
                tracing::warn!("Failed to load preset {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Every readable preset, oldest first
    pub fn list(&self) -> Vec<Preset> {
        let Ok(dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut presets: Vec<Preset> = dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| match read_preset(&p) {
                Ok(preset) => Some(preset),
                Err(e) => {
                    tracing::warn!("Skipping unreadable preset {}: {}", p.display(), e);
                    None
                }
            })
            .collect();
        presets.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.name.cmp(&b.name)));
        presets
    }

    /// Delete a preset. Returns false if there was none by that name.
    pub fn delete(&self, name: &str) -> Result<bool, SettingsError> {
        let path = self.dir.join(preset_file_name(name)?);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_preset(path: &Path) -> Result<Preset, SettingsError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use tempfile::TempDir;

    fn params(contrast: f64) -> Parameters {
        let mut p = Parameters::new();
        p.insert("contrast".into(), ParamValue::Float(contrast));
        p.insert("coloronly".into(), ParamValue::Bool(true));
        p
    }

    #[test]
    fn test_file_name() {
        assert_eq!(preset_file_name("Deep Field").unwrap(), "deep_field.json");
        assert_eq!(preset_file_name("  m51  ").unwrap(), "m51.json");
        assert!(preset_file_name("").is_err());
        assert!(preset_file_name("..").is_err());
        assert!(preset_file_name("../escape").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let presets = PresetStore::open(dir.path()).unwrap();
        assert!(dir.path().join("presets").is_dir());

        let path = presets.save("Deep Field", &params(6.0), "faint outskirts").unwrap();
        assert_eq!(path, dir.path().join("presets").join("deep_field.json"));

        let preset = presets.load("deep field").unwrap();
        assert_eq!(preset.name, "Deep Field");
        assert_eq!(preset.description, "faint outskirts");
        assert_eq!(preset.parameters, params(6.0));
        assert!(!preset.created.is_empty());

        assert!(presets.load("unknown").is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let presets = PresetStore::open(dir.path()).unwrap();
        presets.save("m51", &params(4.0), "").unwrap();
        presets.save("M51", &params(8.0), "").unwrap();

        assert_eq!(presets.list().len(), 1);
        assert_eq!(presets.load("m51").unwrap().parameters, params(8.0));
    }

    #[test]
    fn test_list_oldest_first_and_skips_unreadable() {
        let dir = TempDir::new().unwrap();
        let presets = PresetStore::open(dir.path()).unwrap();
        let write = |file: &str, name: &str, created: &str| {
            let preset = Preset {
                name: name.into(),
                description: String::new(),
                created: created.into(),
                parameters: params(1.0),
            };
            fs::write(presets.dir().join(file), serde_json::to_string(&preset).unwrap()).unwrap();
        };
        write("late.json", "late", "2025-06-01T00:00:00.000000");
        write("early.json", "early", "2025-01-01T00:00:00.000000");
        fs::write(presets.dir().join("broken.json"), "{").unwrap();
        fs::write(presets.dir().join("notes.txt"), "not a preset").unwrap();

        let names: Vec<_> = presets.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["early", "late"]);
        assert!(presets.load("broken").is_none());
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let presets = PresetStore::open(dir.path()).unwrap();
        presets.save("Deep Field", &params(6.0), "").unwrap();

        assert!(presets.delete("DEEP FIELD").unwrap());
        assert!(presets.load("Deep Field").is_none());
        assert!(!presets.delete("Deep Field").unwrap());
        assert!(presets.delete("a/b").is_err());
    }
}
