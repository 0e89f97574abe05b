//! Correlation kernel implementations.
//!
//! Kernels score every placement of a template inside a larger raster with
//! the normalized cross-correlation `dot / (|T| * |W|)`. Window energies are
//! maintained incrementally and partial dot products are abandoned as soon as
//! a Cauchy-Schwarz bound shows the window cannot beat the active threshold.

use crate::candidate::peak::Peak;
use crate::image::RasterImage;
use crate::template::Template;

/// Scan configuration for thresholded enumeration.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Report windows whose score is strictly greater than this value.
    pub threshold: f64,
}

/// Kernel trait for the two scan modes.
pub trait Kernel {
    /// Scans the full placement range and returns every window above the
    /// threshold, in scan order.
    fn scan_full(image: &RasterImage, tpl: &Template, params: ScanParams) -> Vec<Peak>;

    /// Returns the highest score anywhere in `image`, or `floor` if nothing
    /// beats it. Windows that cannot beat the running best are pruned.
    fn scan_max(image: &RasterImage, tpl: &Template, floor: f64) -> f64;
}

/// Returns the inclusive `(max_x, max_y)` placement range, or `None` when the
/// template is empty or does not fit inside the image.
pub(crate) fn placement_range(image: &RasterImage, tpl: &RasterImage) -> Option<(usize, usize)> {
    if tpl.is_empty() || image.width() < tpl.width() || image.height() < tpl.height() {
        return None;
    }
    Some((image.width() - tpl.width(), image.height() - tpl.height()))
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
