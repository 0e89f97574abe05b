//! Precomputed template statistics for correlation scans.

use crate::image::RasterImage;

/// Energy statistics used to normalize scores and bound partial dot products.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateStats {
    magnitude: f64,
    remaining_energy: Vec<f64>,
}

impl TemplateStats {
    /// Computes statistics for a template image.
    ///
    /// `remaining_energy[y]` is the total squared brightness minus the squared
    /// brightness of rows `0..=y`, so the last entry is always zero.
    pub fn from_image(img: &RasterImage) -> Self {
        let row_energy: Vec<f64> = (0..img.height())
            .map(|y| {
                img.row(y)
                    .unwrap_or(&[])
                    .iter()
                    .map(|&v| f64::from(v) * f64::from(v))
                    .sum()
            })
            .collect();

        let total: f64 = row_energy.iter().sum();
        let mut remaining = total;
        let remaining_energy = row_energy
            .iter()
            .map(|energy| {
                remaining -= energy;
                remaining.max(0.0)
            })
            .collect();

        Self {
            magnitude: total.sqrt(),
            remaining_energy,
        }
    }

    /// Returns the L2 norm of the template brightness.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Returns the per-row suffix energy array.
    pub fn remaining_energy(&self) -> &[f64] {
        &self.remaining_energy
    }
}
