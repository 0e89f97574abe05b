//! Sorting labelled training photos by how a database performs on them.
//!
//! A labelled photo is named `X_Y_D.ext`: the expected target center is
//! `(X, Y)` and any detection within `D` pixels of it counts as correct.
//! Classification runs an elastic search and compares the detections with
//! the expectation.

use crate::database::Database;
use crate::image::io::load_image;
use crate::image::RasterImage;
use crate::search::{elastic_search, MatchSet, SearchConfig};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{Point, StacheError, StacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of searching one labelled photo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Exactly one detection, at the expected place.
    TruePositive,
    /// Only misplaced or surplus detections.
    FalsePositive,
    /// A correct detection plus misplaced or surplus ones.
    BothPositive,
    /// Nothing detected.
    Negative,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::TruePositive,
        Category::FalsePositive,
        Category::BothPositive,
        Category::Negative,
    ];

    /// Directory-friendly name, e.g. `true_positive`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TruePositive => "true_positive",
            Category::FalsePositive => "false_positive",
            Category::BothPositive => "both_positive",
            Category::Negative => "negative",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected target location parsed from a labelled filename.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Expectation {
    pub center: Point,
    pub max_distance: f64,
}

impl Expectation {
    /// Parses `X_Y_D.ext` where all three fields are non-negative integers.
    pub fn from_path(path: &Path) -> StacheResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bad = |reason| StacheError::Metadata {
            name: name.clone(),
            reason,
        };

        let (stem, ext) = name.rsplit_once('.').ok_or_else(|| bad("missing extension"))?;
        if !["jpg", "jpeg", "png"].contains(&ext) {
            return Err(bad("expected a .jpg, .jpeg or .png file"));
        }
        let fields: Vec<f64> = stem
            .split('_')
            .map(|field| {
                if !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit()) {
                    field.parse().ok()
                } else {
                    None
                }
            })
            .collect::<Option<_>>()
            .ok_or_else(|| bad("fields must be non-negative integers"))?;
        match fields.as_slice() {
            &[x, y, d] => Ok(Self {
                center: Point::new(x, y),
                max_distance: d,
            }),
            _ => Err(bad("expected X_Y_D")),
        }
    }
}

/// Categorizes a set of detections against the expected location.
///
/// More than one detection always counts as a false positive, even if every
/// detection is near the expected center.
pub fn classify_matches(matches: &MatchSet, expected: &Expectation) -> Category {
    let mut false_positive = matches.len() > 1;
    let mut true_positive = false;
    for m in matches {
        if m.center.distance(expected.center) > expected.max_distance {
            false_positive = true;
        } else {
            true_positive = true;
        }
    }
    match (true_positive, false_positive) {
        (true, true) => Category::BothPositive,
        (false, true) => Category::FalsePositive,
        (true, false) => Category::TruePositive,
        (false, false) => Category::Negative,
    }
}

/// Runs an elastic search over `image` and categorizes the result.
pub fn classify_image(
    db: &Database,
    image: &RasterImage,
    expected: &Expectation,
    cfg: &SearchConfig,
) -> StacheResult<Category> {
    let matches = elastic_search(db, image, None, cfg)?;
    Ok(classify_matches(&matches, expected))
}

/// Loads a labelled photo and categorizes it.
pub fn classify_path(db: &Database, path: &Path, cfg: &SearchConfig) -> StacheResult<Category> {
    let expected = Expectation::from_path(path)?;
    let image = load_image(path)?;
    classify_image(db, &image, &expected, cfg)
}

/// Categorizes many labelled photos, in parallel when the `rayon` feature is
/// enabled.
///
/// Photos that cannot be read or are badly named are logged and skipped. The
/// output keeps the input order.
pub fn classify_batch(db: &Database, paths: &[PathBuf], cfg: &SearchConfig) -> Vec<(PathBuf, Category)> {
    let _span = trace_span!("classify_batch", photos = paths.len()).entered();

    let classify_one = |path: &PathBuf| match classify_path(db, path, cfg) {
        Ok(category) => Some((path.clone(), category)),
        Err(err) => {
            trace_warn!("classify_failed", path = path.display(), error = err);
            None
        }
    };

    #[cfg(feature = "rayon")]
    let results: Vec<(PathBuf, Category)> = {
        use rayon::prelude::*;
        paths.par_iter().filter_map(classify_one).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let results: Vec<(PathBuf, Category)> = paths.iter().filter_map(classify_one).collect();

    trace_event!("classify_done", classified = results.len());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Match;
    use crate::template::TemplateId;

    fn at(x: f64, y: f64) -> Match {
        Match {
            template: TemplateId(0),
            tag: String::new(),
            score: 0.9,
            x: x - 5.0,
            y: y - 5.0,
            width: 10.0,
            height: 10.0,
            center: Point::new(x, y),
            target_width: 10.0,
            angle_deg: 0.0,
        }
    }

    fn expect() -> Expectation {
        Expectation {
            center: Point::new(100.0, 50.0),
            max_distance: 10.0,
        }
    }

    #[test]
    fn parses_labelled_names() {
        let exp = Expectation::from_path(Path::new("/photos/120_45_8.jpg")).unwrap();
        assert_eq!(exp.center, Point::new(120.0, 45.0));
        assert_eq!(exp.max_distance, 8.0);

        for bad in ["1_2.png", "a_2_3.png", "1_2_3.gif", "1_2_3", "1_-2_3.png"] {
            let err = Expectation::from_path(Path::new(bad)).unwrap_err();
            assert!(matches!(err, StacheError::Metadata { .. }), "{bad}");
        }
    }

    #[test]
    fn categories() {
        let set = |ms: Vec<Match>| ms.into_iter().collect::<MatchSet>();
        assert_eq!(classify_matches(&set(vec![]), &expect()), Category::Negative);
        assert_eq!(
            classify_matches(&set(vec![at(104.0, 53.0)]), &expect()),
            Category::TruePositive
        );
        assert_eq!(
            classify_matches(&set(vec![at(150.0, 50.0)]), &expect()),
            Category::FalsePositive
        );
        assert_eq!(
            classify_matches(&set(vec![at(100.0, 50.0), at(10.0, 10.0)]), &expect()),
            Category::BothPositive
        );
        // Two detections near the expected center still count as surplus.
        assert_eq!(
            classify_matches(&set(vec![at(100.0, 50.0), at(102.0, 50.0)]), &expect()),
            Category::BothPositive
        );
    }

    #[test]
    fn category_names_are_snake_case() {
        let names: Vec<_> = Category::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            ["true_positive", "false_positive", "both_positive", "negative"]
        );
        let json = serde_json::to_string(&Category::BothPositive).unwrap();
        assert_eq!(json, "\"both_positive\"");
    }

    #[test]
    fn batch_skips_unreadable_photos() {
        let db = Database::new(0.5).unwrap();
        let paths = vec![PathBuf::from("/nonexistent/1_2_3.png"), PathBuf::from("bad-name.png")];
        assert!(classify_batch(&db, &paths, &SearchConfig::default()).is_empty());
    }
}
