/// Thumbnail derivation for cached images
///
/// Thumbnails are a pluggable capability: the store hands each newly added
/// image to a `ThumbnailDeriver` and records whatever path comes back.
/// `NoThumbnails` is always available; `RasterThumbnailer` needs the
/// `thumbnails` feature (the `image` crate).

use crate::error::CacheError;
use std::path::{Path, PathBuf};

/// Extension of every derived preview
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Bounding box of generated thumbnails
pub const THUMBNAIL_SIZE: u32 = 150;

/// Source extensions worth decoding; anything else (pdf, eps...) is skipped
pub const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg"];

/// What the store asks a deriver to do
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRequest<'a> {
    /// Managed copy of the image (its extension is the store's fixed one)
    pub image: &'a Path,
    /// Lowercase extension of the file the caller handed to `add`
    pub source_extension: Option<&'a str>,
    /// Where the preview must be written
    pub target: &'a Path,
}

impl ThumbnailRequest<'_> {
    pub fn is_raster(&self) -> bool {
        self.source_extension
            .map(|ext| RASTER_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }
}

/// Turns an image into a small preview
///
/// `Ok(None)` means the deriver chose not to produce anything; errors are
/// absorbed by the store and never fail an `add`. Implementations are `Send`
/// so a store can be handed to the thread that owns it.
pub trait ThumbnailDeriver: Send {
    fn derive(&self, request: &ThumbnailRequest<'_>) -> Result<Option<PathBuf>, CacheError>;
}

/// Deriver used when no image decoding is wired in
#[derive(Debug, Default, Clone, Copy)]
pub struct NoThumbnails;

impl ThumbnailDeriver for NoThumbnails {
    fn derive(&self, _request: &ThumbnailRequest<'_>) -> Result<Option<PathBuf>, CacheError> {
        Ok(None)
    }
}

/// Downscales raster images into PNG previews with the `image` crate
#[cfg(feature = "thumbnails")]
#[derive(Debug, Clone, Copy)]
pub struct RasterThumbnailer {
    pub size: u32,
}

#[cfg(feature = "thumbnails")]
impl Default for RasterThumbnailer {
    fn default() -> Self {
        Self { size: THUMBNAIL_SIZE }
    }
}

#[cfg(feature = "thumbnails")]
impl ThumbnailDeriver for RasterThumbnailer {
    fn derive(&self, request: &ThumbnailRequest<'_>) -> Result<Option<PathBuf>, CacheError> {
        use image::{imageops::FilterType, ImageFormat, ImageReader};

        if !request.is_raster() {
            return Ok(None);
        }

        // The managed copy always ends in .tif, so sniff the real format
        let img = ImageReader::open(request.image)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| CacheError::Thumbnail(e.to_string()))?;

        // Fit inside the box, never upscale
        let preview = if img.width() > self.size || img.height() > self.size {
            img.resize(self.size, self.size, FilterType::Lanczos3)
        } else {
            img
        };

        preview
            .to_rgba8()
            .save_with_format(request.target, ImageFormat::Png)
            .map_err(|e| CacheError::Thumbnail(e.to_string()))?;

        Ok(Some(request.target.to_path_buf()))
    }
}

/// The deriver a store gets when the caller does not pick one
pub fn default_deriver() -> Box<dyn ThumbnailDeriver> {
    #[cfg(feature = "thumbnails")]
    {
        Box::new(RasterThumbnailer::default())
    }
    #[cfg(not(feature = "thumbnails"))]
    {
        Box::new(NoThumbnails)
    }
}
