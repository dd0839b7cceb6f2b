/// Cache policy: identifiers, eviction order, search and listing
///
/// Pure functions over entries; the store owns all state and I/O.

use super::entry::{CacheEntry, SortBy};
use crate::params::Parameters;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex characters of parameter hash kept in an identifier
const HASH_LEN: usize = 8;

/// `YYYYMMDDTHHMMSS` is 15 characters once punctuation is gone
const TIME_PREFIX_LEN: usize = 15;

/// Current UTC time in the index's timestamp format
///
/// Fixed-width microseconds keep lexicographic order equal to time order.
/// UTC never repeats an hour, so a newer entry never sorts before an older one.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// `2025-03-14T09:26:53.589793` becomes `20250314T092653`
pub fn compact_timestamp(timestamp: &str) -> String {
    timestamp
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .take(TIME_PREFIX_LEN)
        .collect()
}

/// Short hash of the sorted, stringified parameter set
pub fn parameter_hash(parameters: &Parameters) -> String {
    let mut hasher = Sha256::new();
    // BTreeMap iteration is already sorted by name
    for (name, value) in parameters {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b";");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_LEN].to_string()
}

/// Identifier for an entry created at `timestamp` from `parameters`
pub fn entry_id(timestamp: &str, parameters: &Parameters) -> String {
    format!(
        "{}_{}",
        compact_timestamp(timestamp),
        parameter_hash(parameters)
    )
}

/// Append `-1`, `-2`... until `candidate` no longer collides
///
/// Two adds within the same second with the same parameters would
/// otherwise share an identifier and the second would overwrite the first.
pub fn disambiguate(candidate: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&candidate) {
        return candidate;
    }
    let mut n = 1;
    loop {
        let next = format!("{}-{}", candidate, n);
        if !taken(&next) {
            return next;
        }
        n += 1;
    }
}

/// Entry to evict next: smallest timestamp string other than `keep`
///
/// Ties go to whichever entry the map yields first (smallest identifier);
/// callers must not rely on that.
pub fn eviction_victim(entries: &BTreeMap<String, CacheEntry>, keep: &str) -> Option<String> {
    entries
        .iter()
        .filter(|(id, _)| id.as_str() != keep)
        .min_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp))
        .map(|(id, _)| id.clone())
}

/// Textual rendering of a parameter set used for searching
pub fn render_parameters(parameters: &Parameters) -> String {
    serde_json::to_string(parameters).unwrap_or_default()
}

/// Textual rendering of the channel inputs used for searching
pub fn render_input_files(input_files: &BTreeMap<String, String>) -> String {
    serde_json::to_string(input_files).unwrap_or_default()
}

/// Case-insensitive substring match against parameters or input files
pub fn matches(entry: &CacheEntry, query: &str) -> bool {
    let query = query.to_lowercase();
    render_parameters(&entry.parameters)
        .to_lowercase()
        .contains(&query)
        || render_input_files(&entry.input_files)
            .to_lowercase()
            .contains(&query)
}

/// Order a listing in place; sorting is stable
pub fn sort_entries(entries: &mut [(String, CacheEntry)], sort_by: SortBy) {
    match sort_by {
        SortBy::Newest => entries.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp)),
        SortBy::Oldest => entries.sort_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp)),
        SortBy::Id => entries.sort_by(|a, b| a.0.cmp(&b.0)),
        SortBy::Largest => entries.sort_by(|a, b| b.1.file_size.cmp(&a.1.file_size)),
    }
}

/// File name of an exported image: `<date>_<entry_id>.<ext>`
pub fn export_file_name(entry_id: &str, entry: &CacheEntry, extension: &str) -> String {
    format!("{}_{}.{}", entry.date(), entry_id, extension)
}
