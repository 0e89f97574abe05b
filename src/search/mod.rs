//! Match types, overlap resolution and search entry points.
//!
//! A [`Match`] is one placement of a template's target inside a searched
//! image. [`MatchSet`] collects raw detections and resolves conflicts with
//! greedy non-maximum suppression under an [`OverlapPolicy`].

use crate::candidate::nms::suppress;
use crate::candidate::peak::Peak;
use crate::image::RasterImage;
use crate::kernel::scalar::NccRollingScalar;
use crate::kernel::{Kernel, ScanParams};
use crate::template::{Template, TemplateId};
use crate::util::Point;
use serde::{Deserialize, Serialize};

pub mod elastic;

pub use elastic::{elastic_search, DEFAULT_ELASTIC_SIZES};

/// A located target in the searched image's coordinate frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Template that produced the match.
    pub template: TemplateId,
    /// Tag of the matching template.
    pub tag: String,
    /// Normalized correlation in `[0, 1]`.
    pub score: f64,
    /// Left edge of the matched window.
    pub x: f64,
    /// Top edge of the matched window.
    pub y: f64,
    /// Width of the matched window.
    pub width: f64,
    /// Height of the matched window.
    pub height: f64,
    /// Target center.
    pub center: Point,
    /// Apparent target width.
    pub target_width: f64,
    /// Target rotation in degrees, clockwise.
    pub angle_deg: f64,
}

impl Match {
    /// Builds a match from a scan peak of `tpl`.
    pub fn from_peak(tpl: &Template, peak: Peak) -> Self {
        let target = tpl.target();
        let (x, y) = (peak.x as f64, peak.y as f64);
        Self {
            template: tpl.id(),
            tag: tpl.tag().to_owned(),
            score: peak.score,
            x,
            y,
            width: tpl.width() as f64,
            height: tpl.height() as f64,
            center: Point::new(x + target.center.x, y + target.center.y),
            target_width: target.width,
            angle_deg: target.angle_deg,
        }
    }

    /// Maps a match found in an image scaled by `scale` back to the
    /// unscaled frame.
    pub fn unscaled(mut self, scale: f64) -> Self {
        self.x /= scale;
        self.y /= scale;
        self.width /= scale;
        self.height /= scale;
        self.center = self.center.unscaled(scale);
        self.target_width /= scale;
        self
    }
}

/// Rule deciding whether two detections claim the same region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Target centers closer than half the larger target width.
    #[default]
    Radius,
    /// Matched windows intersect on both axes.
    BoxIntersection,
}

impl OverlapPolicy {
    /// Returns true if `a` and `b` conflict under this policy.
    pub fn conflicts(&self, a: &Match, b: &Match) -> bool {
        match self {
            OverlapPolicy::Radius => {
                let min_distance = a.target_width.max(b.target_width) / 2.0;
                a.center.distance(b.center) < min_distance
            }
            OverlapPolicy::BoxIntersection => {
                a.x + a.width > b.x
                    && b.x + b.width > a.x
                    && a.y + a.height > b.y
                    && b.y + b.height > a.y
            }
        }
    }
}

/// Configuration for database and elastic searches.
#[derive(Clone, Debug, Default)]
pub struct SearchConfig {
    /// Conflict rule for non-maximum suppression.
    pub overlap: OverlapPolicy,
    /// Scan rows in parallel (requires the `rayon` feature, ignored otherwise).
    pub parallel: bool,
}

/// An ordered collection of matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchSet {
    matches: Vec<Match>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn push(&mut self, m: Match) {
        self.matches.push(m);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    pub fn into_vec(self) -> Vec<Match> {
        self.matches
    }

    /// Returns the highest-scoring match, if any.
    pub fn best(&self) -> Option<&Match> {
        self.matches
            .iter()
            .reduce(|best, m| if m.score > best.score { m } else { best })
    }

    /// Returns true if `m` conflicts with any match in the set.
    pub fn conflicts_with(&self, m: &Match, policy: OverlapPolicy) -> bool {
        self.matches.iter().any(|other| policy.conflicts(other, m))
    }

    /// Returns a copy without conflicting matches, best scores first.
    ///
    /// Equal scores keep their current order, so a set built in scan order
    /// breaks ties towards the earliest scanned window.
    pub fn non_overlapping(&self, policy: OverlapPolicy) -> MatchSet {
        self.clone().into_non_overlapping(policy)
    }

    /// Consuming variant of [`MatchSet::non_overlapping`].
    pub fn into_non_overlapping(self, policy: OverlapPolicy) -> MatchSet {
        let matches = suppress(self.matches, |m| m.score, |a, b| policy.conflicts(a, b));
        MatchSet { matches }
    }
}

impl FromIterator<Match> for MatchSet {
    fn from_iter<I: IntoIterator<Item = Match>>(iter: I) -> Self {
        Self {
            matches: iter.into_iter().collect(),
        }
    }
}

impl Extend<Match> for MatchSet {
    fn extend<I: IntoIterator<Item = Match>>(&mut self, iter: I) {
        self.matches.extend(iter);
    }
}

impl IntoIterator for MatchSet {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// Runs a thresholded scan of one template using its own threshold.
pub fn search_template(image: &RasterImage, tpl: &Template, cfg: &SearchConfig) -> Vec<Match> {
    let params = ScanParams {
        threshold: tpl.threshold(),
    };
    let peaks = scan_with(image, tpl, params, cfg.parallel);
    peaks.into_iter().map(|peak| Match::from_peak(tpl, peak)).collect()
}

#[cfg(feature = "rayon")]
fn scan_with(image: &RasterImage, tpl: &Template, params: ScanParams, parallel: bool) -> Vec<Peak> {
    if parallel {
        crate::kernel::rayon::NccRollingPar::scan_full(image, tpl, params)
    } else {
        NccRollingScalar::scan_full(image, tpl, params)
    }
}

#[cfg(not(feature = "rayon"))]
fn scan_with(image: &RasterImage, tpl: &Template, params: ScanParams, _parallel: bool) -> Vec<Peak> {
    NccRollingScalar::scan_full(image, tpl, params)
}

#[cfg(test)]
mod tests {
    use super::{Match, MatchSet, OverlapPolicy};
    use crate::template::TemplateId;
    use crate::util::Point;

    fn m(x: f64, y: f64, score: f64, width: f64) -> Match {
        Match {
            template: TemplateId(0),
            tag: String::new(),
            score,
            x,
            y,
            width,
            height: width,
            center: Point::new(x + width / 2.0, y + width / 2.0),
            target_width: width,
            angle_deg: 0.0,
        }
    }

    #[test]
    fn radius_policy_uses_larger_width() {
        let small = m(0.0, 0.0, 0.9, 4.0);
        let large = m(3.0, 0.0, 0.8, 10.0);
        // Centers: (2, 2) and (8, 5); distance ~6.7 < 10 / 2 is false.
        assert!(!OverlapPolicy::Radius.conflicts(&small, &large));
        let closer = m(0.5, 0.0, 0.8, 10.0);
        assert!(OverlapPolicy::Radius.conflicts(&small, &closer));
        // Centers (2, 2) and (6, 5) are exactly 5 apart: touching is not a conflict.
        let touching = m(1.0, 0.0, 0.8, 10.0);
        assert!(!OverlapPolicy::Radius.conflicts(&small, &touching));
        assert!(!OverlapPolicy::Radius.conflicts(&touching, &small));
    }

    #[test]
    fn box_policy_requires_overlap_on_both_axes() {
        let a = m(0.0, 0.0, 0.9, 10.0);
        assert!(OverlapPolicy::BoxIntersection.conflicts(&a, &m(9.0, 9.0, 0.5, 10.0)));
        assert!(!OverlapPolicy::BoxIntersection.conflicts(&a, &m(10.0, 0.0, 0.5, 10.0)));
        assert!(!OverlapPolicy::BoxIntersection.conflicts(&a, &m(0.0, 12.0, 0.5, 10.0)));
    }

    #[test]
    fn non_overlapping_keeps_best_and_is_idempotent() {
        let set: MatchSet = vec![
            m(0.0, 0.0, 0.7, 10.0),
            m(2.0, 1.0, 0.9, 10.0),
            m(40.0, 40.0, 0.6, 10.0),
            m(41.0, 40.0, 0.6, 10.0),
        ]
        .into_iter()
        .collect();

        for policy in [OverlapPolicy::Radius, OverlapPolicy::BoxIntersection] {
            let once = set.non_overlapping(policy);
            assert_eq!(once.len(), 2);
            assert_eq!(once.as_slice()[0].score, 0.9);
            assert_eq!(once.as_slice()[1].x, 40.0);
            assert_eq!(once.non_overlapping(policy), once);
            for (i, a) in once.iter().enumerate() {
                for b in once.iter().skip(i + 1) {
                    assert!(!policy.conflicts(a, b));
                }
            }
        }
    }

    #[test]
    fn unscaled_divides_geometry_only() {
        let scaled = m(10.0, 20.0, 0.8, 4.0).unscaled(0.5);
        assert_eq!(scaled.x, 20.0);
        assert_eq!(scaled.y, 40.0);
        assert_eq!(scaled.width, 8.0);
        assert_eq!(scaled.target_width, 8.0);
        assert_eq!(scaled.center, Point::new(24.0, 44.0));
        assert_eq!(scaled.score, 0.8);
    }

    #[test]
    fn best_returns_highest_score() {
        let set: MatchSet = vec![m(0.0, 0.0, 0.4, 2.0), m(5.0, 5.0, 0.8, 2.0)]
            .into_iter()
            .collect();
        assert_eq!(set.best().map(|b| b.score), Some(0.8));
        assert!(MatchSet::new().best().is_none());
    }
}
