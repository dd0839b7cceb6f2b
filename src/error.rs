/// Error types
///
/// The cache store raises `CacheError::SourceNotFound` to its callers, and
/// `CacheError::Io` when copying an image into managed storage fails. Other
/// failures are absorbed (logged and recorded as diagnostics) before
/// reaching a public operation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Image file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thumbnail error: {0}")]
    Thumbnail(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingChannels(Vec<&'static str>),

    #[error("Input file does not exist: {}", .0.display())]
    ChannelNotFound(PathBuf),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine a configuration directory")]
    NoConfigDir,

    #[error("Invalid preset name: '{0}'")]
    InvalidPresetName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
