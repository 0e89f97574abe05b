//! Rayon-parallel kernel (feature-gated).
//!
//! Rolling statistics restart at the beginning of every row, so rows are
//! independent units of work. Each worker keeps its own rolling window
//! buffers and per-row results are concatenated in row order, which yields
//! exactly the scalar kernel's output.

use crate::candidate::peak::Peak;
use crate::image::RasterImage;
use crate::kernel::scalar::{scan_row_into, scan_row_max, RollingWindow};
use crate::kernel::{placement_range, Kernel, ScanParams};
use crate::template::Template;
use rayon::prelude::*;

/// Row-parallel normalized cross-correlation kernel.
pub struct NccRollingPar;

impl Kernel for NccRollingPar {
    fn scan_full(image: &RasterImage, tpl: &Template, params: ScanParams) -> Vec<Peak> {
        let Some((max_x, max_y)) = placement_range(image, tpl.image()) else {
            return Vec::new();
        };

        let row_results: Vec<Vec<Peak>> = (0..=max_y)
            .into_par_iter()
            .map_init(
                || RollingWindow::new(image, tpl),
                |window, y| {
                    let mut row_peaks = Vec::new();
                    scan_row_into(window, y, max_x, params.threshold, &mut row_peaks);
                    row_peaks
                },
            )
            .collect();

        row_results.into_iter().flatten().collect()
    }

    fn scan_max(image: &RasterImage, tpl: &Template, floor: f64) -> f64 {
        let Some((max_x, max_y)) = placement_range(image, tpl.image()) else {
            return floor;
        };

        (0..=max_y)
            .into_par_iter()
            .map_init(
                || RollingWindow::new(image, tpl),
                |window, y| scan_row_max(window, y, max_x, floor),
            )
            .reduce(|| floor, f64::max)
    }
}
