/// Record of failures the cache absorbed instead of raising
///
/// Every best-effort path in the store (index load and persist, thumbnail
/// derivation, file deletion, export copies) reports here. Each record is
/// logged through `tracing` as it arrives and kept until the caller drains
/// the sink with `CacheStore::take_diagnostics`.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Index document exists but could not be read or parsed; store starts empty
    IndexUnreadable { path: PathBuf, reason: String },
    /// One index record could not be decoded and was skipped
    MalformedEntry { entry_id: String, reason: String },
    /// Recorded image path was stale; the canonical file was adopted
    ImageRepaired { entry_id: String, path: PathBuf },
    /// No image file could be found for an indexed entry; entry dropped
    EntryDropped { entry_id: String },
    /// Recorded thumbnail path was stale; the canonical file was adopted
    ThumbnailRepaired { entry_id: String, path: PathBuf },
    /// Thumbnail file missing on load; entry kept without a thumbnail
    ThumbnailCleared { entry_id: String },
    /// Thumbnail derivation failed during add
    ThumbnailFailed { entry_id: String, reason: String },
    /// Index document could not be written
    PersistFailed { reason: String },
    /// A managed file could not be deleted
    RemoveFailed { path: PathBuf, reason: String },
    /// Managed directories could not be wiped or recreated
    ClearFailed { reason: String },
    /// An export copy failed or the destination was unusable
    ExportFailed { entry_id: Option<String>, reason: String },
}

impl Diagnostic {
    /// Repairs are routine; everything else lost something
    pub fn is_repair(&self) -> bool {
        matches!(
            self,
            Diagnostic::ImageRepaired { .. } | Diagnostic::ThumbnailRepaired { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::IndexUnreadable { path, reason } => {
                write!(f, "index {} unreadable: {}", path.display(), reason)
            }
            Diagnostic::MalformedEntry { entry_id, reason } => {
                write!(f, "skipped malformed entry {}: {}", entry_id, reason)
            }
            Diagnostic::ImageRepaired { entry_id, path } => {
                write!(f, "fixed cache path for {}: {}", entry_id, path.display())
            }
            Diagnostic::EntryDropped { entry_id } => {
                write!(f, "dropped entry {}: image file missing", entry_id)
            }
            Diagnostic::ThumbnailRepaired { entry_id, path } => {
                write!(f, "fixed thumbnail path for {}: {}", entry_id, path.display())
            }
            Diagnostic::ThumbnailCleared { entry_id } => {
                write!(f, "thumbnail missing for {}", entry_id)
            }
            Diagnostic::ThumbnailFailed { entry_id, reason } => {
                write!(f, "failed to generate thumbnail for {}: {}", entry_id, reason)
            }
            Diagnostic::PersistFailed { reason } => {
                write!(f, "failed to save cache index: {}", reason)
            }
            Diagnostic::RemoveFailed { path, reason } => {
                write!(f, "failed to delete {}: {}", path.display(), reason)
            }
            Diagnostic::ClearFailed { reason } => {
                write!(f, "failed to reset cache directories: {}", reason)
            }
            Diagnostic::ExportFailed { entry_id: Some(id), reason } => {
                write!(f, "failed to export {}: {}", id, reason)
            }
            Diagnostic::ExportFailed { entry_id: None, reason } => {
                write!(f, "export aborted: {}", reason)
            }
        }
    }
}

/// Append-only sink owned by one store
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn record(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_repair() {
            tracing::debug!("{}", diagnostic);
        } else {
            tracing::warn!("{}", diagnostic);
        }
        self.records.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.records)
    }
}
