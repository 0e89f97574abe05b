//! Threshold calibration against negative samples.
//!
//! A template's threshold is `s + (1 - s) * max_neg`, where `max_neg` is the
//! best correlation the template reaches anywhere in any negative image. A
//! mirror pair shares the larger of its two calibrated thresholds.

use crate::image::RasterImage;
use crate::kernel::scalar::NccRollingScalar;
use crate::kernel::Kernel;
use crate::template::Template;
use crate::util::math::strict_threshold;

/// Returns the highest correlation of `tpl` across all `negatives`.
///
/// The running best is carried from one negative to the next, so later
/// negatives only score windows that could raise it. Returns 0 when there
/// are no negatives.
pub fn max_negative_correlation(tpl: &Template, negatives: &[RasterImage]) -> f64 {
    negatives
        .iter()
        .fold(0.0, |best, negative| NccRollingScalar::scan_max(negative, tpl, best))
}

/// Threshold for a template whose best negative correlation is `max_negative`.
pub fn calibrated_threshold(strictness: f64, max_negative: f64) -> f64 {
    strict_threshold(strictness, max_negative)
}

/// Calibrates one template against `negatives`.
pub fn template_threshold(tpl: &Template, negatives: &[RasterImage], strictness: f64) -> f64 {
    calibrated_threshold(strictness, max_negative_correlation(tpl, negatives))
}

/// Shared threshold for a template and its mirror.
pub fn pair_threshold(source: f64, mirror: f64) -> f64 {
    source.max(mirror)
}
