use super::diagnostics::{Diagnostic, Diagnostics};
use super::entry::{CacheEntry, CacheStats, InputFiles, SortBy};
use super::policy;
use super::thumbnail::{default_deriver, ThumbnailDeriver, ThumbnailRequest, THUMBNAIL_EXTENSION};
use super::CacheConfig;
use crate::error::CacheError;
use crate::params::Parameters;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of every managed image copy
pub const IMAGE_EXTENSION: &str = "tif";

/// Name of the index document under the base directory
pub const INDEX_FILE: &str = "metadata.json";

const IMAGES_DIR: &str = "images";
const THUMBNAILS_DIR: &str = "thumbnails";

/// The CacheStore keeps generated images and their metadata on disk.
///
/// Layout under the base directory:
/// - `images/<entry_id>.tif` - managed copies of generated images
/// - `thumbnails/<entry_id>.png` - derived previews (optional)
/// - `metadata.json` - the index document
///
/// The in-memory map is the source of truth during a session; the index is
/// rewritten after every mutating operation. One store per base directory:
/// there is no locking against a second instance.
pub struct CacheStore {
    config: CacheConfig,
    images_dir: PathBuf,
    thumbnails_dir: PathBuf,
    index_path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    deriver: Box<dyn ThumbnailDeriver>,
    diagnostics: Diagnostics,
}

impl CacheStore {
    /// Open (or create) a cache with the default thumbnail deriver.
    ///
    /// Fails only when the managed directories cannot be created. A missing
    /// or corrupt index yields an empty store.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        Self::open_with(config, default_deriver())
    }

    /// Open (or create) a cache with a specific thumbnail deriver
    pub fn open_with(
        config: CacheConfig,
        deriver: Box<dyn ThumbnailDeriver>,
    ) -> Result<Self, CacheError> {
        let images_dir = config.base_dir.join(IMAGES_DIR);
        let thumbnails_dir = config.base_dir.join(THUMBNAILS_DIR);
        let index_path = config.base_dir.join(INDEX_FILE);

        fs::create_dir_all(&images_dir)?;
        fs::create_dir_all(&thumbnails_dir)?;

        let mut store = CacheStore {
            config,
            images_dir,
            thumbnails_dir,
            index_path,
            entries: BTreeMap::new(),
            deriver,
            diagnostics: Diagnostics::default(),
        };
        store.load_index();

        tracing::debug!(
            "Cache opened at {} with {} entries",
            store.config.base_dir.display(),
            store.entries.len()
        );

        Ok(store)
    }

    // ========== Queries ==========

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn thumbnails_dir(&self) -> &Path {
        &self.thumbnails_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.entries.contains_key(entry_id)
    }

    /// Look up one entry. Does not affect eviction order.
    pub fn get(&self, entry_id: &str) -> Option<&CacheEntry> {
        self.entries.get(entry_id)
    }

    /// Snapshot of all entries in the requested order
    pub fn list(&self, sort_by: SortBy) -> Vec<(String, CacheEntry)> {
        let mut listing: Vec<_> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        policy::sort_entries(&mut listing, sort_by);
        listing
    }

    /// Entries whose parameters or input files contain `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<(String, CacheEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| policy::matches(entry, query))
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let total_size_bytes: u64 = self.entries.values().map(|e| e.file_size).sum();
        CacheStats {
            total_entries: self.entries.len(),
            max_entries: self.config.max_entries,
            total_size_bytes,
            total_size_mb: total_size_bytes as f64 / (1024.0 * 1024.0),
            base_directory: self.config.base_dir.clone(),
        }
    }

    /// Drain everything the store absorbed since the last call
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    // ========== Mutations ==========

    /// Copy a generated image into the cache and register its metadata.
    ///
    /// Returns the new entry identifier. Fails with
    /// `CacheError::SourceNotFound` when `source` does not exist, or with an
    /// I/O error if the copy into managed storage fails; nothing is recorded
    /// in either case. Thumbnail and index-write failures do not fail the add.
    /// May evict older entries.
    pub fn add(
        &mut self,
        source: impl AsRef<Path>,
        parameters: &Parameters,
        input_files: &InputFiles,
    ) -> Result<String, CacheError> {
        self.add_at(policy::now_timestamp(), source.as_ref(), parameters, input_files)
    }

    /// `add` with an explicit creation timestamp
    pub(crate) fn add_at(
        &mut self,
        timestamp: String,
        source: &Path,
        parameters: &Parameters,
        input_files: &InputFiles,
    ) -> Result<String, CacheError> {
        if !source.exists() {
            return Err(CacheError::SourceNotFound(source.to_path_buf()));
        }

        let candidate = policy::entry_id(&timestamp, parameters);
        let entry_id = policy::disambiguate(candidate, |id| {
            self.entries.contains_key(id) || self.image_path_for(id).exists()
        });

        let image_path = self.image_path_for(&entry_id);
        let copied = fs::copy(source, &image_path).and_then(|_| fs::metadata(&image_path));
        let file_size = match copied {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                // Never leave a partial copy without an index entry
                self.delete_file(&image_path);
                return Err(e.into());
            }
        };

        let mut entry = CacheEntry {
            image_path,
            timestamp,
            parameters: parameters.clone(),
            input_files: input_files.clone(),
            file_size,
            thumbnail_path: None,
        };

        let source_extension = source
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        entry.thumbnail_path = self.derive_thumbnail(&entry_id, &entry.image_path, source_extension.as_deref());

        tracing::debug!("Cached {} as {} ({} bytes)", source.display(), entry_id, file_size);
        self.entries.insert(entry_id.clone(), entry);

        self.enforce_limit(&entry_id);
        self.persist();

        Ok(entry_id)
    }

    /// Delete one entry and its files. Returns false if the id is unknown.
    pub fn remove(&mut self, entry_id: &str) -> bool {
        if !self.remove_entry(entry_id) {
            return false;
        }
        self.persist();
        true
    }

    /// Delete every entry and wipe both managed directories.
    /// Returns how many entries existed before.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();

        for dir in [&self.images_dir, &self.thumbnails_dir] {
            let reset = match fs::remove_dir_all(dir) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => fs::create_dir_all(dir),
            };
            if let Err(e) = reset {
                self.diagnostics.record(Diagnostic::ClearFailed {
                    reason: format!("{}: {}", dir.display(), e),
                });
            }
        }

        self.entries.clear();
        self.persist();

        tracing::info!("Cleared {} cache entries", count);
        count
    }

    /// Copy every entry whose image still exists into `destination`.
    ///
    /// Files are named `<date>_<entry_id>.tif`. Entries with a missing image
    /// are skipped silently; the result maps what was actually exported.
    pub fn export(&mut self, destination: impl AsRef<Path>) -> BTreeMap<String, PathBuf> {
        let destination = destination.as_ref();
        let mut exported = BTreeMap::new();

        if let Err(e) = fs::create_dir_all(destination) {
            self.diagnostics.record(Diagnostic::ExportFailed {
                entry_id: None,
                reason: format!("{}: {}", destination.display(), e),
            });
            return exported;
        }

        for (entry_id, entry) in &self.entries {
            if !entry.image_path.exists() {
                continue;
            }
            let target =
                destination.join(policy::export_file_name(entry_id, entry, IMAGE_EXTENSION));
            match fs::copy(&entry.image_path, &target) {
                Ok(_) => {
                    exported.insert(entry_id.clone(), target);
                }
                Err(e) => self.diagnostics.record(Diagnostic::ExportFailed {
                    entry_id: Some(entry_id.clone()),
                    reason: e.to_string(),
                }),
            }
        }

        tracing::debug!("Exported {} images to {}", exported.len(), destination.display());
        exported
    }

    // ========== Internals ==========

    /// Effective entry bound; a zero bound would evict every new entry
    fn limit(&self) -> usize {
        self.config.max_entries.max(1)
    }

    fn image_path_for(&self, entry_id: &str) -> PathBuf {
        self.images_dir
            .join(format!("{}.{}", entry_id, IMAGE_EXTENSION))
    }

    fn thumbnail_path_for(&self, entry_id: &str) -> PathBuf {
        self.thumbnails_dir
            .join(format!("{}.{}", entry_id, THUMBNAIL_EXTENSION))
    }

    fn derive_thumbnail(
        &mut self,
        entry_id: &str,
        image: &Path,
        source_extension: Option<&str>,
    ) -> Option<PathBuf> {
        let target = self.thumbnail_path_for(entry_id);
        let request = ThumbnailRequest {
            image,
            source_extension,
            target: &target,
        };
        match self.deriver.derive(&request) {
            Ok(path) => path,
            Err(e) => {
                self.diagnostics.record(Diagnostic::ThumbnailFailed {
                    entry_id: entry_id.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// Evict oldest entries until the bound holds; `keep` is never evicted
    fn enforce_limit(&mut self, keep: &str) {
        while self.entries.len() > self.limit() {
            let Some(victim) = policy::eviction_victim(&self.entries, keep) else {
                break;
            };
            tracing::info!("Evicting oldest cache entry {}", victim);
            self.remove_entry(&victim);
        }
    }

    /// Drop one entry and its files without persisting
    fn remove_entry(&mut self, entry_id: &str) -> bool {
        let Some(entry) = self.entries.remove(entry_id) else {
            return false;
        };
        self.delete_file(&entry.image_path);
        if let Some(thumbnail) = &entry.thumbnail_path {
            self.delete_file(thumbnail);
        }
        true
    }

    fn delete_file(&mut self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.diagnostics.record(Diagnostic::RemoveFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Rewrite the index document from the in-memory map
    fn persist(&mut self) {
        if let Err(e) = self.write_index() {
            self.diagnostics.record(Diagnostic::PersistFailed {
                reason: e.to_string(),
            });
        }
    }

    fn write_index(&self) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.index_path.with_extension("json.tmp");
        let written = fs::write(&tmp, json.as_bytes()).and_then(|_| fs::rename(&tmp, &self.index_path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Load the index, skipping malformed records and repairing stale paths
    fn load_index(&mut self) {
        if !self.index_path.exists() {
            return;
        }

        let document = fs::read_to_string(&self.index_path)
            .map_err(CacheError::from)
            .and_then(|text| {
                serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&text)
                    .map_err(CacheError::from)
            });
        let document = match document {
            Ok(document) => document,
            Err(e) => {
                self.diagnostics.record(Diagnostic::IndexUnreadable {
                    path: self.index_path.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        for (entry_id, record) in document {
            match serde_json::from_value::<CacheEntry>(record) {
                Ok(entry) => {
                    if let Some(entry) = self.validate(&entry_id, entry) {
                        self.entries.insert(entry_id, entry);
                    }
                }
                Err(e) => self.diagnostics.record(Diagnostic::MalformedEntry {
                    entry_id,
                    reason: e.to_string(),
                }),
            }
        }
    }

    /// Repair-or-drop for the image, repair-or-clear for the thumbnail
    fn validate(&mut self, entry_id: &str, mut entry: CacheEntry) -> Option<CacheEntry> {
        if !is_managed_file(&entry.image_path, &self.images_dir) {
            let canonical = self.image_path_for(entry_id);
            if !canonical.is_file() {
                self.diagnostics.record(Diagnostic::EntryDropped {
                    entry_id: entry_id.to_string(),
                });
                return None;
            }
            self.diagnostics.record(Diagnostic::ImageRepaired {
                entry_id: entry_id.to_string(),
                path: canonical.clone(),
            });
            entry.image_path = canonical;
        }

        let stale_thumbnail = entry
            .thumbnail_path
            .as_deref()
            .is_some_and(|thumbnail| !is_managed_file(thumbnail, &self.thumbnails_dir));
        if stale_thumbnail {
            let canonical = self.thumbnail_path_for(entry_id);
            if canonical.is_file() {
                self.diagnostics.record(Diagnostic::ThumbnailRepaired {
                    entry_id: entry_id.to_string(),
                    path: canonical.clone(),
                });
                entry.thumbnail_path = Some(canonical);
            } else {
                self.diagnostics.record(Diagnostic::ThumbnailCleared {
                    entry_id: entry_id.to_string(),
                });
                entry.thumbnail_path = None;
            }
        }

        Some(entry)
    }
}

/// An existing file located directly inside `dir`
fn is_managed_file(path: &Path, dir: &Path) -> bool {
    path.is_file() && path.parent() == Some(dir)
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("base_dir", &self.config.base_dir)
            .field("max_entries", &self.config.max_entries)
            .field("entries", &self.entries.len())
            .finish()
    }
}
