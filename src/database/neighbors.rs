//! Nearest-neighbor report between the templates of one database.
//!
//! Templates that strongly match one another are redundant or mislabelled.
//! For every template the report names the other template that best matches
//! any edge-trimmed crop of it.

use crate::database::Database;
use crate::image::RasterImage;
use crate::template::{Target, Template, TemplateId};
use crate::trace::trace_span;
use crate::util::{Point, StacheResult};
use std::fmt;

/// A template paired with its closest other template.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborPair {
    pub template: TemplateId,
    pub tag: String,
    pub threshold: f64,
    /// Closest other template, or `None` if nothing correlates at all.
    pub neighbor: Option<(TemplateId, String)>,
    pub correlation: f64,
}

impl fmt::Display for NeighborPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.neighbor {
            None => write!(f, "{} - no match", self.tag),
            Some((_, tag)) => write!(
                f,
                "{} - {} - {:.6} (threshold {:.6})",
                self.tag, tag, self.correlation, self.threshold
            ),
        }
    }
}

/// Builds the neighbor report, best-correlated pairs first.
///
/// `edge_leeway` is the fraction of each dimension that may be trimmed; each
/// edge loses between 0 and `edge_leeway * size / 2` pixels.
pub fn nearest_neighbors(db: &Database, edge_leeway: f64) -> StacheResult<Vec<NeighborPair>> {
    let _span = trace_span!("nearest_neighbors", templates = db.len()).entered();
    let crops = db
        .templates()
        .iter()
        .map(|tpl| edge_crops(tpl.image(), edge_leeway))
        .collect::<StacheResult<Vec<_>>>()?;

    let mut pairs: Vec<NeighborPair> = db
        .templates()
        .iter()
        .zip(&crops)
        .map(|(tpl, crops)| closest(db, tpl, crops))
        .collect();
    pairs.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    Ok(pairs)
}

fn closest(db: &Database, tpl: &Template, crops: &[Template]) -> NeighborPair {
    let mut best: Option<(TemplateId, String)> = None;
    let mut best_corr = 0.0;
    for other in db.templates() {
        if other.id() == tpl.id() {
            continue;
        }
        let corr = crops
            .iter()
            .fold(0.0, |acc: f64, crop| acc.max(crop.max_correlation(other.image())));
        if corr > best_corr {
            best_corr = corr;
            best = Some((other.id(), other.tag().to_owned()));
        }
    }
    NeighborPair {
        template: tpl.id(),
        tag: tpl.tag().to_owned(),
        threshold: tpl.threshold(),
        neighbor: best,
        correlation: best_corr,
    }
}

/// Returns every crop of `image` with each edge trimmed by up to
/// `leeway * size / 2` pixels, wrapped as throwaway templates.
fn edge_crops(image: &RasterImage, leeway: f64) -> StacheResult<Vec<Template>> {
    let (w, h) = (image.width(), image.height());
    let max_x = (leeway * w as f64 / 2.0) as usize;
    let max_y = (leeway * h as f64 / 2.0) as usize;

    let mut crops = Vec::new();
    for left in 0..=max_x {
        for right in 0..=max_x {
            for top in 0..=max_y {
                for bottom in 0..=max_y {
                    if left + right >= w || top + bottom >= h {
                        continue;
                    }
                    let crop = image.sub_image(left, top, w - left - right, h - top - bottom)?;
                    let target = Target {
                        center: Point::default(),
                        angle_deg: 0.0,
                        width: crop.width() as f64,
                    };
                    crops.push(Template::new(crop, target, ""));
                }
            }
        }
    }
    Ok(crops)
}
