//! Uniform rescaling of rasters for multi-scale search.
//!
//! Resampling is delegated to `image::imageops::resize` with a bilinear
//! (triangle) filter operating directly on the `f32` brightness buffer.

use crate::image::RasterImage;
use crate::util::{StacheError, StacheResult};
use ::image::imageops::{self, FilterType};
use ::image::{ImageBuffer, Luma};

/// Resizes `img` to `width x height` with bilinear filtering.
pub fn resize_bilinear(img: &RasterImage, width: usize, height: usize) -> StacheResult<RasterImage> {
    if img.is_empty() || width == 0 || height == 0 {
        return RasterImage::filled(width, height, 0.0);
    }
    let src_w = u32::try_from(img.width()).map_err(|_| StacheError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    let src_h = u32::try_from(img.height()).map_err(|_| StacheError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    let dst_w =
        u32::try_from(width).map_err(|_| StacheError::InvalidDimensions { width, height })?;
    let dst_h =
        u32::try_from(height).map_err(|_| StacheError::InvalidDimensions { width, height })?;

    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(src_w, src_h, img.data().to_vec()).ok_or(
            StacheError::BufferLength {
                needed: img.width() * img.height(),
                got: img.data().len(),
            },
        )?;
    let resized = imageops::resize(&buffer, dst_w, dst_h, FilterType::Triangle);
    RasterImage::new(resized.into_raw(), width, height)
}

/// Resizes `img` so that its longer side equals `long_edge`, keeping the
/// aspect ratio.
///
/// Returns the resized raster and the applied scale factor (new / old). The
/// shorter side is rounded and never drops below one pixel.
pub fn scale_to_long_edge(img: &RasterImage, long_edge: usize) -> StacheResult<(RasterImage, f64)> {
    if long_edge == 0 {
        return Err(StacheError::InvalidInput("long edge size must be > 0"));
    }
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Ok((img.clone(), 1.0));
    }
    let long = w.max(h);
    let scale = long_edge as f64 / long as f64;
    let shorter = |side: usize| ((side as f64 * scale).round() as usize).max(1);
    let (new_w, new_h) = if w >= h {
        (long_edge, shorter(h))
    } else {
        (shorter(w), long_edge)
    };
    let resized = resize_bilinear(img, new_w, new_h)?;
    Ok((resized, scale))
}
