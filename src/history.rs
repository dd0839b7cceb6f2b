/// Command history
///
/// Every command line the front-end assembles is remembered, newest first,
/// in `command_history.json` next to the settings document. The list is
/// capped; reading and writing it never fails the caller.

use crate::cache::policy::now_timestamp;
use crate::cache::InputFiles;
use crate::error::SettingsError;
use crate::params::Parameters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = "command_history.json";

/// Entries kept before the oldest are dropped
pub const MAX_HISTORY: usize = 100;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: String,
    /// The command as it would be typed in a shell
    pub command: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub input_files: InputFiles,
}

#[derive(Debug)]
pub struct CommandHistory {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl CommandHistory {
    /// Load the history kept in `config_dir`
    ///
    /// A missing file is an empty history. So is an unreadable one, after a
    /// warning.
    pub fn open(config_dir: &Path) -> Self {
        let path = config_dir.join(HISTORY_FILE);
        let mut entries = if path.exists() {
            match read_entries(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Failed to load command history {}: {}", path.display(), e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        entries.truncate(MAX_HISTORY);

        Self {
            path,
            entries,
            max_entries: MAX_HISTORY,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self.entries.truncate(max_entries);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a command at the front and save
    pub fn add_command(&mut self, command: &str, parameters: &Parameters, input_files: &InputFiles) {
        self.entries.insert(
            0,
            HistoryEntry {
                timestamp: now_timestamp(),
                command: command.to_string(),
                parameters: parameters.clone(),
                input_files: input_files.clone(),
            },
        );
        self.entries.truncate(self.max_entries);
        self.save();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    fn save(&self) {
        if let Err(e) = self.write() {
            tracing::warn!("Failed to save command history {}: {}", self.path.display(), e);
        }
    }

    fn write(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>, SettingsError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use tempfile::TempDir;

    fn params(qbright: f64) -> Parameters {
        let mut p = Parameters::new();
        p.insert("qbright".into(), ParamValue::Float(qbright));
        p
    }

    fn inputs() -> InputFiles {
        [("red_path", "/d/r.fits"), ("green_path", "/d/g.fits"), ("blue_path", "/d/b.fits")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_newest_first_and_persisted() {
        let dir = TempDir::new().unwrap();
        let mut history = CommandHistory::open(dir.path());
        assert!(history.is_empty());

        history.add_command("astscript-color-faint-gray a", &params(1.0), &inputs());
        history.add_command("astscript-color-faint-gray b", &params(2.0), &inputs());

        let reopened = CommandHistory::open(dir.path());
        let commands: Vec<_> = reopened.entries().iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["astscript-color-faint-gray b", "astscript-color-faint-gray a"]);
        assert_eq!(reopened.entries()[0].parameters, params(2.0));
        assert_eq!(reopened.entries()[0].input_files, inputs());
    }

    #[test]
    fn test_history_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut history = CommandHistory::open(dir.path()).with_max_entries(3);

        for n in 0..5 {
            history.add_command(&format!("cmd {}", n), &params(n as f64), &inputs());
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.entries()[0].command, "cmd 4");
        assert_eq!(history.entries()[2].command, "cmd 2");
        assert_eq!(CommandHistory::open(dir.path()).len(), 3);
    }

    #[test]
    fn test_default_cap() {
        let dir = TempDir::new().unwrap();
        let mut history = CommandHistory::open(dir.path());
        for n in 0..(MAX_HISTORY + 5) {
            history.add_command(&format!("cmd {}", n), &Parameters::new(), &InputFiles::new());
        }
        assert_eq!(history.len(), MAX_HISTORY);
    }

    #[test]
    fn test_corrupt_file_gives_empty_history() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(HISTORY_FILE), "[{ broken").unwrap();

        let mut history = CommandHistory::open(dir.path());
        assert!(history.is_empty());

        // Still usable, and the next save replaces the corrupt file
        history.add_command("cmd", &Parameters::new(), &InputFiles::new());
        assert_eq!(CommandHistory::open(dir.path()).len(), 1);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let mut history = CommandHistory::open(dir.path());
        history.add_command("cmd", &params(1.0), &inputs());

        history.clear();
        assert!(history.is_empty());
        assert!(CommandHistory::open(dir.path()).is_empty());
    }

    #[test]
    fn test_save_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        // A file where the config directory should be
        let blocker = dir.path().join("config");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut history = CommandHistory::open(&blocker);
        history.add_command("cmd", &params(1.0), &inputs());
        assert_eq!(history.len(), 1);
    }
}
