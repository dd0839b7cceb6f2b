/// Cache data structures
///
/// These structs are what flows between the cache store, the index
/// document on disk and whatever presents cached results.

use crate::params::Parameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Logical channel name (`red`, `green`, `blue`) to source file path
pub type InputFiles = BTreeMap<String, String>;

/// One cached generation result
///
/// Serialized as one record of the index document. Unknown fields make the
/// record malformed; a missing `thumbnail_path` reads as "no thumbnail".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheEntry {
    /// Managed copy of the generated image, owned by the store
    pub image_path: PathBuf,
    /// Creation instant, ISO-8601 local time with microseconds
    pub timestamp: String,
    /// Full generation configuration used to produce the image
    pub parameters: Parameters,
    /// Channel inputs, informational only
    pub input_files: InputFiles,
    /// Byte length of the managed copy when it was added
    pub file_size: u64,
    /// Derived preview, absent when derivation was skipped or failed
    #[serde(default)]
    pub thumbnail_path: Option<PathBuf>,
}

impl CacheEntry {
    /// Date part of the timestamp (`YYYY-MM-DD`)
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }
}

/// Aggregate figures over the live entries
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub max_entries: usize,
    /// Sum of recorded `file_size` values, not a live re-stat
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub base_directory: PathBuf,
}

/// Ordering for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Most recent first
    #[default]
    Newest,
    Oldest,
    /// Entry identifier, ascending
    Id,
    /// Largest recorded file size first
    Largest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn sample() -> CacheEntry {
        let mut parameters = Parameters::new();
        parameters.insert("qbright".into(), ParamValue::Float(50.0));
        let mut input_files = InputFiles::new();
        input_files.insert("red".into(), "/data/m51_r.fits".into());
        CacheEntry {
            image_path: PathBuf::from("/cache/images/x.tif"),
            timestamp: "2025-03-14T09:26:53.589793".into(),
            parameters,
            input_files,
            file_size: 42,
            thumbnail_path: None,
        }
    }

    #[test]
    fn test_date_prefix() {
        assert_eq!(sample().date(), "2025-03-14");

        let mut short = sample();
        short.timestamp = "2025".into();
        assert_eq!(short.date(), "2025");
    }

    #[test]
    fn test_missing_thumbnail_field_reads_as_none() {
        let json = r#"{
            "image_path": "/cache/images/x.tif",
            "timestamp": "2025-03-14T09:26:53.589793",
            "parameters": {"qbright": 50.0},
            "input_files": {"red": "/data/m51_r.fits"},
            "file_size": 42
        }"#;
        let entry: CacheEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry, sample());
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let json = r#"{
            "image_path": "/cache/images/x.tif",
            "timestamp": "2025-03-14T09:26:53.589793",
            "parameters": {},
            "input_files": {},
            "file_size": 42,
            "rating": 5
        }"#;
        assert!(serde_json::from_str::<CacheEntry>(json).is_err());
    }

    #[test]
    fn test_null_thumbnail_serializes() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json["thumbnail_path"].is_null());
        assert_eq!(json["file_size"], 42);
    }
}
