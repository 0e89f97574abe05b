//! Loading rasters via the `image` crate.

use crate::image::RasterImage;
use crate::util::{StacheError, StacheResult};
use std::path::Path;

/// File extensions treated as decodable images when scanning directories.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Returns true if the path carries a supported image extension.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Decodes an in-memory image (PNG, JPEG or GIF) into a raster.
pub fn decode_image(bytes: &[u8]) -> StacheResult<RasterImage> {
    let img = ::image::load_from_memory(bytes).map_err(|err| StacheError::Decode {
        reason: err.to_string(),
    })?;
    Ok(RasterImage::from_dynamic_image(&img))
}

/// Loads an image from disk and converts it to a brightness raster.
pub fn load_image<P: AsRef<Path>>(path: P) -> StacheResult<RasterImage> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| StacheError::io(path, err))?;
    decode_image(&bytes).map_err(|err| match err {
        StacheError::Decode { reason } => StacheError::Decode {
            reason: format!("{}: {reason}", path.display()),
        },
        other => other,
    })
}
