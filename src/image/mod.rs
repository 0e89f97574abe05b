//! Grayscale brightness rasters.
//!
//! `RasterImage` is an owned, immutable, row-major buffer of brightness
//! values in `[0, 1]`. Its L2 magnitude is computed once at construction and
//! cached. Zero-sized rasters are valid; they never match anything.

use crate::util::{StacheError, StacheResult};
use serde::{Deserialize, Serialize};

pub mod io;
pub mod resize;

/// Owned grayscale image with a cached L2 magnitude.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RasterRecord", into = "RasterRecord")]
pub struct RasterImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
    magnitude: f64,
}

/// On-disk form of a raster; the magnitude is re-derived on load.
#[derive(Serialize, Deserialize)]
struct RasterRecord {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl TryFrom<RasterRecord> for RasterImage {
    type Error = StacheError;

    fn try_from(record: RasterRecord) -> StacheResult<Self> {
        RasterImage::new(record.data, record.width, record.height)
    }
}

impl From<RasterImage> for RasterRecord {
    fn from(img: RasterImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            data: img.data,
        }
    }
}

impl RasterImage {
    /// Creates a raster from row-major brightness values.
    ///
    /// The buffer must hold exactly `width * height` finite values. Decoded
    /// images stay within `[0, 1]`, but any finite value is accepted here,
    /// including resampling overshoot. Scores are only guaranteed to lie in
    /// `[0, 1]` for non-negative brightness.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> StacheResult<Self> {
        let needed = width
            .checked_mul(height)
            .ok_or(StacheError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(StacheError::BufferLength {
                needed,
                got: data.len(),
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(StacheError::InvalidInput("brightness values must be finite"));
        }
        let magnitude = data
            .iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt();
        Ok(Self {
            data,
            width,
            height,
            magnitude,
        })
    }

    /// Creates a raster filled with a single brightness value.
    pub fn filled(width: usize, height: usize, value: f32) -> StacheResult<Self> {
        let len = width
            .checked_mul(height)
            .ok_or(StacheError::InvalidDimensions { width, height })?;
        Self::new(vec![value; len], width, height)
    }

    /// Converts a decoded image; brightness is the mean of R, G and B.
    pub fn from_dynamic_image(img: &::image::DynamicImage) -> Self {
        let rgb = img.to_rgb16();
        let width = rgb.width() as usize;
        let height = rgb.height() as usize;
        let scale = 1.0 / (f64::from(u16::MAX) * 3.0);
        let mut data = Vec::with_capacity(width * height);
        let mut energy = 0.0f64;
        for px in rgb.pixels() {
            let [r, g, b] = px.0;
            let value = ((u32::from(r) + u32::from(g) + u32::from(b)) as f64 * scale) as f32;
            energy += f64::from(value) * f64::from(value);
            data.push(value);
        }
        Self {
            data,
            width,
            height,
            magnitude: energy.sqrt(),
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns true when the raster has no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the brightness buffer in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the L2 norm of all brightness values.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Returns the brightness at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Returns row `y` as a slice of length `width`.
    pub fn row(&self, y: usize) -> Option<&[f32]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }

    /// Copies a rectangular sub-window into a new raster.
    pub fn sub_image(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> StacheResult<RasterImage> {
        let out_of_bounds = StacheError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or(out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or(out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let mut data = Vec::with_capacity(width * height);
        for row in self.data.chunks_exact(self.width.max(1)).skip(y).take(height) {
            data.extend_from_slice(&row[x..end_x]);
        }
        RasterImage::new(data, width, height)
    }

    /// Returns a left-right mirrored copy.
    pub fn mirrored(&self) -> RasterImage {
        let mut data = Vec::with_capacity(self.data.len());
        if self.width > 0 {
            for row in self.data.chunks_exact(self.width) {
                data.extend(row.iter().rev());
            }
        }
        // Mirroring permutes pixels, so the magnitude is unchanged.
        Self {
            data,
            width: self.width,
            height: self.height,
            magnitude: self.magnitude,
        }
    }

    /// Normalized correlation between this image and a constant signal.
    ///
    /// This is how well a perfectly flat background would match the image
    /// when it is used as a template.
    pub fn flat_correlation(&self) -> f64 {
        if self.is_empty() || self.magnitude == 0.0 {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| f64::from(v)).sum();
        let flat_magnitude = (self.data.len() as f64).sqrt();
        sum / (self.magnitude * flat_magnitude)
    }

    /// Suggested acceptance threshold when no negative samples are available.
    pub fn recommended_threshold(&self, strictness: f64) -> f64 {
        crate::util::math::strict_threshold(strictness, self.flat_correlation())
    }
}

#[cfg(test)]
mod tests {
    use super::RasterImage;
    use crate::util::StacheError;

    fn ramp(width: usize, height: usize) -> RasterImage {
        let data = (0..width * height)
            .map(|i| i as f32 / (width * height) as f32)
            .collect();
        RasterImage::new(data, width, height).unwrap()
    }

    #[test]
    fn new_rejects_wrong_length() {
        let err = RasterImage::new(vec![0.5; 5], 2, 2).unwrap_err();
        assert_eq!(err, StacheError::BufferLength { needed: 4, got: 5 });
    }

    #[test]
    fn zero_sized_images_are_valid() {
        let img = RasterImage::new(Vec::new(), 0, 7).unwrap();
        assert!(img.is_empty());
        assert_eq!(img.magnitude(), 0.0);
        assert_eq!(img.flat_correlation(), 0.0);
        assert!(img.row(0).is_some_and(|r| r.is_empty()));
    }

    #[test]
    fn magnitude_is_l2_norm() {
        let img = RasterImage::new(vec![0.0, 0.6, 0.8, 0.0], 2, 2).unwrap();
        assert!((img.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sub_image_copies_window() {
        let img = RasterImage::new((0..16).map(|v| v as f32 / 16.0).collect(), 4, 4).unwrap();
        let sub = img.sub_image(1, 2, 2, 2).unwrap();
        assert_eq!(sub.data(), &[9.0 / 16.0, 10.0 / 16.0, 13.0 / 16.0, 14.0 / 16.0]);

        let err = img.sub_image(3, 3, 2, 1).unwrap_err();
        assert!(matches!(err, StacheError::RoiOutOfBounds { .. }));
    }

    #[test]
    fn mirrored_flips_rows_and_keeps_magnitude() {
        let img = ramp(3, 2);
        let mirror = img.mirrored();
        assert_eq!(mirror.row(0).unwrap(), &[img.data()[2], img.data()[1], img.data()[0]]);
        assert_eq!(mirror.mirrored(), img);
        assert!((mirror.magnitude() - img.magnitude()).abs() < 1e-12);
    }

    #[test]
    fn flat_image_has_unit_flat_correlation() {
        let img = RasterImage::filled(5, 3, 0.4).unwrap();
        assert!((img.flat_correlation() - 1.0).abs() < 1e-6);
        assert!((img.recommended_threshold(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn from_dynamic_image_averages_channels() {
        let mut rgb = ::image::RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, ::image::Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, ::image::Rgb([255, 255, 255]));
        let img = RasterImage::from_dynamic_image(&::image::DynamicImage::ImageRgb8(rgb));
        assert_eq!(img.width(), 2);
        assert!((img.get(0, 0).unwrap() - 1.0 / 3.0).abs() < 1e-6);
        assert!((img.get(1, 0).unwrap() - 1.0).abs() < 1e-6);
    }
}
