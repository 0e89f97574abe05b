//! Templates: reference rasters plus overlay placement metadata.
//!
//! A template owns its raster, the placement of the target relative to the
//! template's top-left corner, and an acceptance threshold. Matching
//! statistics are computed on first use and cached in a `OnceLock`. The raster
//! is immutable, so the cache is never invalidated.

use crate::candidate::peak::Peak;
use crate::image::io::load_image;
use crate::image::RasterImage;
use crate::kernel::scalar::{score_at, NccRollingScalar};
use crate::kernel::{Kernel, ScanParams};
use crate::util::{Point, StacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

pub mod metadata;
mod stats;

pub use metadata::PlacementMetadata;
pub use stats::TemplateStats;

/// Strictness used for the flat-background threshold of fresh templates.
pub const DEFAULT_FLAT_STRICTNESS: f64 = 0.7;

/// Handle identifying a template inside its database.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TemplateId(pub usize);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where and how the overlay attaches, in the template's own frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Target center relative to the template's top-left corner.
    pub center: Point,
    /// Clockwise rotation in degrees.
    pub angle_deg: f64,
    /// Target width in template pixels.
    pub width: f64,
}

impl Target {
    /// Reflects the target for a template mirrored left-right.
    pub fn mirrored(&self, template_width: usize) -> Target {
        Target {
            center: Point::new(template_width as f64 - self.center.x, self.center.y),
            angle_deg: -self.angle_deg,
            width: self.width,
        }
    }
}

/// A searchable reference raster with target placement metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Template {
    id: TemplateId,
    tag: String,
    image: RasterImage,
    target: Target,
    threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mirror_of: Option<TemplateId>,
    #[serde(skip)]
    stats: OnceLock<TemplateStats>,
}

impl Template {
    /// Creates a template with a flat-background default threshold.
    ///
    /// The id is assigned when the template is inserted into a database.
    pub fn new(image: RasterImage, target: Target, tag: impl Into<String>) -> Self {
        let threshold = image.recommended_threshold(DEFAULT_FLAT_STRICTNESS);
        Self {
            id: TemplateId::default(),
            tag: tag.into(),
            image,
            target,
            threshold,
            mirror_of: None,
            stats: OnceLock::new(),
        }
    }

    /// Loads a template image whose filename carries placement metadata.
    ///
    /// See [`metadata`] for the accepted filename layouts. The tag is the
    /// file name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> StacheResult<Self> {
        let path = path.as_ref();
        let meta = PlacementMetadata::from_path(path)?;
        let image = load_image(path)?;
        let target = Target {
            center: meta.center,
            angle_deg: meta.angle_deg,
            width: meta.width.unwrap_or(image.width() as f64),
        };
        let tag = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(image, target, tag))
    }

    /// Overrides the acceptance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns the database handle of this template.
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: TemplateId) {
        self.id = id;
    }

    /// Returns the user-defined tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Replaces the user-defined tag.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// Returns the template raster.
    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Returns the target placement.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Returns the acceptance threshold in `[0, 1]`.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub(crate) fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Returns the template this one mirrors, if it is a synthesized mirror.
    pub fn mirror_of(&self) -> Option<TemplateId> {
        self.mirror_of
    }

    /// Template width in pixels.
    pub fn width(&self) -> usize {
        self.image.width()
    }

    /// Template height in pixels.
    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Returns the cached matching statistics, computing them on first use.
    pub fn stats(&self) -> &TemplateStats {
        self.stats
            .get_or_init(|| TemplateStats::from_image(&self.image))
    }

    /// Returns a left-right mirrored copy linked back to this template.
    ///
    /// The raster is flipped horizontally, the target center is reflected across the
    /// template width and the angle is negated. The threshold is copied and
    /// is expected to be recalibrated by the owning database.
    pub fn mirrored(&self) -> Template {
        Template {
            id: TemplateId::default(),
            tag: format!("{} (mirror)", self.tag),
            image: self.image.mirrored(),
            target: self.target.mirrored(self.image.width()),
            threshold: self.threshold,
            mirror_of: Some(self.id),
            stats: OnceLock::new(),
        }
    }

    /// Returns every window of `image` whose correlation exceeds `threshold`.
    ///
    /// Peaks are reported in scan order (row-major, top-left first).
    pub fn correlations(&self, image: &RasterImage, threshold: f64) -> Vec<Peak> {
        NccRollingScalar::scan_full(image, self, ScanParams { threshold })
    }

    /// Returns the maximum correlation (0 to 1) anywhere in `image`.
    pub fn max_correlation(&self, image: &RasterImage) -> f64 {
        NccRollingScalar::scan_max(image, self, 0.0)
    }

    /// Computes the exact correlation of the window whose top-left corner is
    /// `(x, y)`, or `None` if the window does not fit.
    pub fn correlation_at(&self, image: &RasterImage, x: usize, y: usize) -> Option<f64> {
        score_at(image, self, x, y)
    }
}
