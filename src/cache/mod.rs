/// Image cache module
///
/// This module handles:
/// - Storing generated images with their generation parameters (store.rs)
/// - Entry identifiers, eviction order, search and listing (policy.rs)
/// - Deriving preview thumbnails (thumbnail.rs)
/// - Recording failures the cache absorbs (diagnostics.rs)

pub mod diagnostics;
pub mod entry;
pub mod policy;
pub mod store;
pub mod thumbnail;

pub use diagnostics::Diagnostic;
pub use entry::{CacheEntry, CacheStats, InputFiles, SortBy};
pub use store::CacheStore;
pub use thumbnail::{NoThumbnails, ThumbnailDeriver, ThumbnailRequest};

#[cfg(feature = "thumbnails")]
pub use thumbnail::RasterThumbnailer;

use std::path::PathBuf;

/// Default bound on live entries
pub const DEFAULT_MAX_ENTRIES: usize = 25;

/// Where a cache lives and how many entries it keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub base_dir: PathBuf,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}
