//! Template databases with negative-sample calibration.
//!
//! A [`Database`] owns an ordered list of templates, the negative images used
//! to calibrate their thresholds, and the strictness knob. Template ids are
//! issued on insertion and equal the template's index.

use crate::image::RasterImage;
use crate::search::{search_template, MatchSet, SearchConfig};
use crate::template::{Template, TemplateId};
use crate::trace::{trace_event, trace_span};
use crate::util::{StacheError, StacheResult};
use serde::{Deserialize, Serialize};

pub mod calibrate;
pub mod load;
pub mod neighbors;
mod persist;

pub use load::LoadConfig;
pub use neighbors::{nearest_neighbors, NeighborPair};

use calibrate::{pair_threshold, template_threshold};

/// An ordered, calibrated collection of templates.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "DatabaseRecord")]
pub struct Database {
    templates: Vec<Template>,
    negatives: Vec<RasterImage>,
    strictness: f64,
}

/// Unchecked decoded form of a database.
#[derive(Deserialize)]
struct DatabaseRecord {
    templates: Vec<Template>,
    #[serde(default)]
    negatives: Vec<RasterImage>,
    strictness: f64,
}

impl TryFrom<DatabaseRecord> for Database {
    type Error = StacheError;

    fn try_from(record: DatabaseRecord) -> StacheResult<Self> {
        check_strictness(record.strictness)?;
        for (index, tpl) in record.templates.iter().enumerate() {
            if tpl.id() != TemplateId(index) {
                return Err(StacheError::InvalidInput("template ids must match their order"));
            }
            if !tpl.threshold().is_finite() {
                return Err(StacheError::InvalidInput("template threshold must be finite"));
            }
            if let Some(source) = tpl.mirror_of() {
                let valid = source.0 != index
                    && record
                        .templates
                        .get(source.0)
                        .is_some_and(|src| src.mirror_of().is_none());
                if !valid {
                    return Err(StacheError::InvalidInput("mirror refers to an unknown template"));
                }
            }
        }
        Ok(Database {
            templates: record.templates,
            negatives: record.negatives,
            strictness: record.strictness,
        })
    }
}

fn check_strictness(strictness: f64) -> StacheResult<()> {
    if (0.0..=1.0).contains(&strictness) {
        Ok(())
    } else {
        Err(StacheError::InvalidInput("strictness must be within [0, 1]"))
    }
}

impl Database {
    /// Creates an empty database without negatives.
    pub fn new(strictness: f64) -> StacheResult<Self> {
        Self::with_negatives(Vec::new(), strictness)
    }

    /// Creates an empty database calibrated against `negatives`.
    pub fn with_negatives(negatives: Vec<RasterImage>, strictness: f64) -> StacheResult<Self> {
        check_strictness(strictness)?;
        Ok(Self {
            templates: Vec::new(),
            negatives,
            strictness,
        })
    }

    pub fn strictness(&self) -> f64 {
        self.strictness
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id.0)
    }

    pub fn negatives(&self) -> &[RasterImage] {
        &self.negatives
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Inserts a template, calibrates it, and returns its id.
    ///
    /// A mirrored template must point at a same-sized, non-mirror template of
    /// this database; the pair then shares the larger threshold. Other
    /// templates keep their thresholds.
    pub fn add_template(&mut self, mut tpl: Template) -> StacheResult<TemplateId> {
        let id = TemplateId(self.templates.len());
        let mut threshold = template_threshold(&tpl, &self.negatives, self.strictness);
        if let Some(source) = tpl.mirror_of() {
            let source = self
                .templates
                .get_mut(source.0)
                .filter(|src| {
                    src.mirror_of().is_none()
                        && src.width() == tpl.width()
                        && src.height() == tpl.height()
                })
                .ok_or(StacheError::InvalidInput("mirror refers to an unknown template"))?;
            threshold = pair_threshold(source.threshold(), threshold);
            source.set_threshold(threshold);
        }
        tpl.set_id(id);
        tpl.set_threshold(threshold);
        trace_event!("template_added", id = id.0, threshold = threshold);
        self.templates.push(tpl);
        Ok(id)
    }

    /// Adds a left-right mirror for every template that is neither a mirror
    /// nor already mirrored, and returns the new ids.
    ///
    /// Each mirror and its source share the larger of their calibrated
    /// thresholds.
    pub fn add_mirrors(&mut self) -> Vec<TemplateId> {
        let _span = trace_span!("add_mirrors", templates = self.templates.len()).entered();
        let mut mirrored = vec![false; self.templates.len()];
        for tpl in &self.templates {
            if let Some(source) = tpl.mirror_of() {
                mirrored[source.0] = true;
            }
        }

        let sources: Vec<usize> = (0..self.templates.len())
            .filter(|&i| !mirrored[i] && self.templates[i].mirror_of().is_none())
            .collect();

        let mut added = Vec::with_capacity(sources.len());
        for source in sources {
            let mut mirror = self.templates[source].mirrored();
            let id = TemplateId(self.templates.len());
            mirror.set_id(id);
            let source_threshold =
                template_threshold(&self.templates[source], &self.negatives, self.strictness);
            let mirror_threshold = template_threshold(&mirror, &self.negatives, self.strictness);
            let shared = pair_threshold(source_threshold, mirror_threshold);
            self.templates[source].set_threshold(shared);
            mirror.set_threshold(shared);
            self.templates.push(mirror);
            added.push(id);
        }
        trace_event!("mirrors_added", count = added.len());
        added
    }

    /// Changes the strictness and recalibrates every template.
    pub fn set_strictness(&mut self, strictness: f64) -> StacheResult<()> {
        check_strictness(strictness)?;
        self.strictness = strictness;
        self.recalibrate();
        Ok(())
    }

    /// Replaces the negative samples and recalibrates every template.
    pub fn set_negatives(&mut self, negatives: Vec<RasterImage>) {
        self.negatives = negatives;
        self.recalibrate();
    }

    /// Drops the negative samples, keeping the current thresholds.
    ///
    /// Useful before saving, since negatives are only needed to calibrate.
    pub fn strip_negatives(&mut self) {
        self.negatives.clear();
    }

    /// Prepends `prefix` to every template tag.
    pub fn prefix_tags(&mut self, prefix: &str) {
        for tpl in &mut self.templates {
            let tag = format!("{prefix}{}", tpl.tag());
            tpl.set_tag(tag);
        }
    }

    /// Recomputes every threshold from the negatives and strictness.
    pub fn recalibrate(&mut self) {
        let _span = trace_span!(
            "recalibrate",
            templates = self.templates.len(),
            negatives = self.negatives.len()
        )
        .entered();

        let thresholds = self.raw_thresholds();
        let mut shared = thresholds.clone();
        for (index, tpl) in self.templates.iter().enumerate() {
            if let Some(source) = tpl.mirror_of() {
                let pair = pair_threshold(thresholds[source.0], thresholds[index]);
                shared[source.0] = shared[source.0].max(pair);
                shared[index] = pair;
            }
        }
        for (tpl, threshold) in self.templates.iter_mut().zip(shared) {
            tpl.set_threshold(threshold);
        }
    }

    #[cfg(feature = "rayon")]
    fn raw_thresholds(&self) -> Vec<f64> {
        use rayon::prelude::*;
        self.templates
            .par_iter()
            .map(|tpl| template_threshold(tpl, &self.negatives, self.strictness))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn raw_thresholds(&self) -> Vec<f64> {
        self.templates
            .iter()
            .map(|tpl| template_threshold(tpl, &self.negatives, self.strictness))
            .collect()
    }

    /// Finds every template in `image` and resolves overlapping detections.
    pub fn search(&self, image: &RasterImage, cfg: &SearchConfig) -> MatchSet {
        let _span = trace_span!(
            "db_search",
            templates = self.templates.len(),
            width = image.width(),
            height = image.height()
        )
        .entered();

        let mut found = MatchSet::new();
        for tpl in &self.templates {
            found.extend(search_template(image, tpl, cfg));
        }
        let raw = found.len();
        let result = found.into_non_overlapping(cfg.overlap);
        trace_event!("db_search_done", raw = raw, kept = result.len());
        result
    }
}
