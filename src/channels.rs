/// Channel file discovery
///
/// Recognizes FITS images by name or header and scans folders for them, so
/// a front-end can offer red/green/blue candidates without the user picking
/// each file by hand. Nothing here decodes image data.

use crate::params::ChannelPaths;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Plain FITS extensions
const FITS_EXTENSIONS: &[&str] = &["fits", "fit", "fts"];

/// First card of a primary header or an extension header
const FITS_MAGIC: &[&[u8]] = &[b"SIMPLE  =", b"XTENSION="];

/// Check whether a file looks like a FITS image
///
/// Accepts `.fits`/`.fit`/`.fts`, their `.fz` compressed forms, or any file
/// whose first header card is `SIMPLE` or `XTENSION`.
pub fn is_fits_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    let extension = lower_extension(path);
    if let Some(ext) = extension.as_deref() {
        if FITS_EXTENSIONS.contains(&ext) {
            return true;
        }
        if ext == "fz" {
            let inner = path.file_stem().map(Path::new).and_then(lower_extension);
            if inner.is_some_and(|inner| FITS_EXTENSIONS.contains(&inner.as_str())) {
                return true;
            }
        }
    }

    has_fits_header(path)
}

fn lower_extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn has_fits_header(path: &Path) -> bool {
    let mut header = [0u8; 9];
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    match file.read_exact(&mut header) {
        Ok(()) => FITS_MAGIC.iter().any(|magic| header.starts_with(magic)),
        Err(_) => false,
    }
}

/// Find every FITS file below `folder`, sorted by path
pub fn scan_channels(folder: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_fits_file(p))
        .collect();
    found.sort();

    tracing::debug!("Found {} FITS files in {}", found.len(), folder.display());
    found
}

/// Filename hints for each channel, checked against the lowercase stem
const RED_HINTS: &[&str] = &["_red", "_r", "_i"];
const GREEN_HINTS: &[&str] = &["_green", "_g"];
const BLUE_HINTS: &[&str] = &["_blue", "_b", "_u"];

/// Assign red/green/blue from filename suffixes
///
/// Returns `None` unless all three channels are found. The first match in
/// `files` order wins for each channel.
pub fn guess_channels(files: &[PathBuf]) -> Option<ChannelPaths> {
    let pick = |hints: &[&str]| {
        files.iter().find(|path| {
            let stem = fits_stem(path);
            hints.iter().any(|hint| stem.ends_with(hint))
        })
    };

    let red = pick(RED_HINTS)?;
    let green = pick(GREEN_HINTS)?;
    let blue = pick(BLUE_HINTS)?;
    Some(ChannelPaths::new(red, green, blue))
}

/// Stem with `.fits` / `.fits.fz` style suffixes removed, lowercased
fn fits_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".fz").unwrap_or(&name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if FITS_EXTENSIONS.contains(&ext) => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Human-readable file size: `512 B`, `1.5 KB`, `2.0 MB`...
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    for unit in ["KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_is_fits_by_extension() {
        let dir = TempDir::new().unwrap();
        assert!(is_fits_file(&touch(dir.path(), "a.FITS", b"")));
        assert!(is_fits_file(&touch(dir.path(), "b.fit", b"")));
        assert!(is_fits_file(&touch(dir.path(), "c.fits.fz", b"")));
        assert!(!is_fits_file(&touch(dir.path(), "d.fz", b"")));
        assert!(!is_fits_file(&touch(dir.path(), "e.png", b"\x89PNG")));
        assert!(!is_fits_file(&dir.path().join("missing.fits")));
    }

    #[test]
    fn test_is_fits_by_header() {
        let dir = TempDir::new().unwrap();
        assert!(is_fits_file(&touch(dir.path(), "raw.dat", b"SIMPLE  =                    T")));
        assert!(is_fits_file(&touch(dir.path(), "ext.bin", b"XTENSION= 'IMAGE   '")));
        assert!(!is_fits_file(&touch(dir.path(), "short", b"SIMP")));
    }

    #[test]
    fn test_scan_channels_recurses_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "night2/m51_g.fits", b"");
        touch(dir.path(), "night1/m51_r.fits", b"");
        touch(dir.path(), "night1/notes.txt", b"hello");

        let found = scan_channels(dir.path());
        assert_eq!(
            found,
            vec![
                dir.path().join("night1/m51_r.fits"),
                dir.path().join("night2/m51_g.fits"),
            ]
        );
    }

    #[test]
    fn test_guess_channels() {
        let files: Vec<PathBuf> = ["/d/ngc_blue.fits", "/d/ngc_G.fits.fz", "/d/ngc_r.fits"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let channels = guess_channels(&files).unwrap();
        assert_eq!(channels.red, PathBuf::from("/d/ngc_r.fits"));
        assert_eq!(channels.green, PathBuf::from("/d/ngc_G.fits.fz"));
        assert_eq!(channels.blue, PathBuf::from("/d/ngc_blue.fits"));

        assert!(guess_channels(&files[..2]).is_none());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_file_size(3 * 1024u64.pow(4)), "3.0 TB");
    }
}
