//! Scalar rolling-statistics kernel.
//!
//! For a `h x w` template the window energy is rebuilt in `O(h * w)` at the
//! start of every row and then updated in `O(h)` per column step: each row of
//! the window loses its leftmost squared value and gains the new rightmost
//! one. The same row differences keep the per-row remaining-energy suffix
//! array current, which feeds the pruning bound
//! `(dot + sqrt(rem_w[y] * rem_t[y])) / (|W| * |T|)`.

use crate::candidate::peak::Peak;
use crate::image::RasterImage;
use crate::kernel::{placement_range, Kernel, ScanParams};
use crate::template::{Template, TemplateStats};

/// Rolling energy at or below this value is recomputed exactly.
///
/// The rolling update accumulates rounding error, so an all-black window that
/// follows bright columns may not land on exactly zero, and a dim window can
/// drift far from its true energy.
const DIM_ENERGY: f64 = 1e-8;

/// Pruning only fires when the bound is below the threshold by this margin.
const PRUNE_SLACK: f64 = 1e-9;

/// Scalar normalized cross-correlation kernel with rolling window energy.
pub struct NccRollingScalar;

/// Rolling window state for one template over one image.
pub(crate) struct RollingWindow<'a> {
    image: &'a RasterImage,
    tpl: &'a RasterImage,
    stats: &'a TemplateStats,
    y: usize,
    energy: f64,
    remaining: Vec<f64>,
}

impl<'a> RollingWindow<'a> {
    pub(crate) fn new(image: &'a RasterImage, tpl: &'a Template) -> Self {
        Self {
            image,
            tpl: tpl.image(),
            stats: tpl.stats(),
            y: 0,
            energy: 0.0,
            remaining: vec![0.0; tpl.height()],
        }
    }

    /// Places the window at `(0, y)` and recomputes its energies.
    pub(crate) fn start_row(&mut self, y: usize) {
        let img_w = self.image.width();
        let tpl_w = self.tpl.width();
        let data = self.image.data();

        self.y = y;
        let mut energy = 0.0f64;
        for ty in (0..self.tpl.height()).rev() {
            self.remaining[ty] = energy;
            let start = (y + ty) * img_w;
            energy += data[start..start + tpl_w]
                .iter()
                .map(|&v| f64::from(v) * f64::from(v))
                .sum::<f64>();
        }
        self.energy = energy;
    }

    /// Slides the window one column to the right, so it starts at `x`.
    ///
    /// `x` must be at least 1 and the window must have been started on this
    /// row.
    pub(crate) fn advance(&mut self, x: usize) {
        let img_w = self.image.width();
        let tpl_w = self.tpl.width();
        let data = self.image.data();

        let mut compounded = 0.0f64;
        for ty in (0..self.tpl.height()).rev() {
            self.remaining[ty] += compounded;
            let row = (self.y + ty) * img_w;
            let leaving = f64::from(data[row + x - 1]);
            let entering = f64::from(data[row + x + tpl_w - 1]);
            let change = entering * entering - leaving * leaving;
            self.energy += change;
            compounded += change;
        }
    }

    /// Scores the window at column `x` of the current row.
    ///
    /// Returns 0 as soon as the bound shows the score cannot reach
    /// `threshold`.
    pub(crate) fn score(&self, x: usize, threshold: f64) -> f64 {
        if self.energy <= DIM_ENERGY {
            return self.score_exact(x);
        }
        let tpl_mag = self.stats.magnitude();
        if tpl_mag == 0.0 {
            return 0.0;
        }
        let energy = self.energy;

        let img_w = self.image.width();
        let tpl_w = self.tpl.width();
        let data = self.image.data();
        let tpl_data = self.tpl.data();
        let tpl_remaining = self.stats.remaining_energy();
        let norm = 1.0 / (energy.sqrt() * tpl_mag);
        let cutoff = threshold - PRUNE_SLACK;

        let mut dot = 0.0f64;
        for ty in 0..self.tpl.height() {
            let start = (self.y + ty) * img_w + x;
            let window_row = &data[start..start + tpl_w];
            let tpl_row = &tpl_data[ty * tpl_w..(ty + 1) * tpl_w];
            dot += window_row
                .iter()
                .zip(tpl_row)
                .map(|(&a, &b)| f64::from(a) * f64::from(b))
                .sum::<f64>();

            let rest = (self.remaining[ty].max(0.0) * tpl_remaining[ty]).sqrt();
            if (dot + rest) * norm < cutoff {
                return 0.0;
            }
        }
        dot * norm
    }

    /// Scores the window at column `x` from scratch, without pruning.
    fn score_exact(&self, x: usize) -> f64 {
        let img_w = self.image.width();
        let tpl_w = self.tpl.width();
        let data = self.image.data();
        let tpl_data = self.tpl.data();

        let mut energy = 0.0f64;
        let mut dot = 0.0f64;
        for ty in 0..self.tpl.height() {
            let start = (self.y + ty) * img_w + x;
            let window_row = &data[start..start + tpl_w];
            let tpl_row = &tpl_data[ty * tpl_w..(ty + 1) * tpl_w];
            for (&a, &b) in window_row.iter().zip(tpl_row) {
                energy += f64::from(a) * f64::from(a);
                dot += f64::from(a) * f64::from(b);
            }
        }

        let tpl_mag = self.stats.magnitude();
        if energy == 0.0 || tpl_mag == 0.0 {
            return if energy == 0.0 && tpl_mag == 0.0 { 1.0 } else { 0.0 };
        }
        dot / (energy.sqrt() * tpl_mag)
    }
}

/// Scans one row of placements and appends peaks above `threshold`.
pub(crate) fn scan_row_into(
    window: &mut RollingWindow<'_>,
    y: usize,
    max_x: usize,
    threshold: f64,
    out: &mut Vec<Peak>,
) {
    window.start_row(y);
    for x in 0..=max_x {
        if x > 0 {
            window.advance(x);
        }
        let score = window.score(x, threshold);
        if score > threshold {
            out.push(Peak { x, y, score });
        }
    }
}

/// Scans one row of placements, tightening `best` as better windows appear.
pub(crate) fn scan_row_max(window: &mut RollingWindow<'_>, y: usize, max_x: usize, best: f64) -> f64 {
    let mut best = best;
    window.start_row(y);
    for x in 0..=max_x {
        if x > 0 {
            window.advance(x);
        }
        let score = window.score(x, best);
        if score > best {
            best = score;
        }
    }
    best
}

/// Computes the exact correlation of one window without rolling or pruning.
///
/// Returns `None` when the window at `(x, y)` does not fit inside `image`.
pub fn score_at(image: &RasterImage, tpl: &Template, x: usize, y: usize) -> Option<f64> {
    let (max_x, max_y) = placement_range(image, tpl.image())?;
    if x > max_x || y > max_y {
        return None;
    }

    let tpl_img = tpl.image();
    let mut dot = 0.0f64;
    let mut energy = 0.0f64;
    for ty in 0..tpl_img.height() {
        let start = (y + ty) * image.width() + x;
        let window_row = &image.data()[start..start + tpl_img.width()];
        let tpl_row = tpl_img.row(ty)?;
        for (&a, &b) in window_row.iter().zip(tpl_row) {
            let a = f64::from(a);
            dot += a * f64::from(b);
            energy += a * a;
        }
    }

    let tpl_mag = tpl.stats().magnitude();
    if energy == 0.0 || tpl_mag == 0.0 {
        return Some(if energy == tpl_mag { 1.0 } else { 0.0 });
    }
    Some(dot / (energy.sqrt() * tpl_mag))
}

impl Kernel for NccRollingScalar {
    fn scan_full(image: &RasterImage, tpl: &Template, params: ScanParams) -> Vec<Peak> {
        let Some((max_x, max_y)) = placement_range(image, tpl.image()) else {
            return Vec::new();
        };

        let mut window = RollingWindow::new(image, tpl);
        let mut peaks = Vec::new();
        for y in 0..=max_y {
            scan_row_into(&mut window, y, max_x, params.threshold, &mut peaks);
        }
        peaks
    }

    fn scan_max(image: &RasterImage, tpl: &Template, floor: f64) -> f64 {
        let Some((max_x, max_y)) = placement_range(image, tpl.image()) else {
            return floor;
        };

        let mut window = RollingWindow::new(image, tpl);
        let mut best = floor;
        for y in 0..=max_y {
            best = scan_row_max(&mut window, y, max_x, best);
        }
        best
    }
}
