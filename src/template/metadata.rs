//! Placement metadata encoded in training image filenames.
//!
//! Two stem layouts are accepted, separated by underscores:
//!
//! - `N_X_Y_Adeg`: target center `(X, Y)` and clockwise angle `A` degrees;
//!   the target width defaults to the template width.
//! - `N_X_Y_W_Adeg`: as above with an explicit target width `W`.
//!
//! `N` is any identifier unique within the training directory.

use crate::util::{Point, StacheError, StacheResult};
use std::path::Path;

/// Placement fields parsed from a filename.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementMetadata {
    pub center: Point,
    pub angle_deg: f64,
    pub width: Option<f64>,
}

impl PlacementMetadata {
    /// Parses the placement fields from a path's file stem.
    pub fn from_path(path: &Path) -> StacheResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StacheError::Metadata {
                name: name.clone(),
                reason: "filename is not valid UTF-8",
            })?;
        Self::parse(stem).map_err(|reason| StacheError::Metadata { name, reason })
    }

    fn parse(stem: &str) -> Result<Self, &'static str> {
        let fields: Vec<&str> = stem.split('_').collect();
        let (center, width, angle) = match fields.as_slice() {
            [_, x, y, angle] => ((*x, *y), None, *angle),
            [_, x, y, w, angle] => ((*x, *y), Some(*w), *angle),
            _ => return Err("expected N_X_Y_Adeg or N_X_Y_W_Adeg"),
        };

        let angle = angle
            .strip_suffix("deg")
            .ok_or("angle field must end with \"deg\"")?;
        let angle_deg = parse_number(angle).ok_or("angle is not a number")?;
        let x = parse_number(center.0).ok_or("center x is not a number")?;
        let y = parse_number(center.1).ok_or("center y is not a number")?;
        let width = match width {
            Some(w) => {
                let w = parse_number(w).ok_or("target width is not a number")?;
                if w <= 0.0 {
                    return Err("target width must be positive");
                }
                Some(w)
            }
            None => None,
        };

        Ok(Self {
            center: Point::new(x, y),
            angle_deg,
            width,
        })
    }
}

fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}
