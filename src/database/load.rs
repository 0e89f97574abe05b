//! Building databases from training directories.
//!
//! A training directory holds one image per template, named with placement
//! metadata (see [`crate::template::metadata`]). Negative samples live in an
//! optional `negatives/` subdirectory and may have any name.

use crate::database::Database;
use crate::image::io::{has_image_extension, load_image};
use crate::image::RasterImage;
use crate::template::Template;
use crate::trace::{trace_event, trace_span};
use crate::util::{StacheError, StacheResult};
use std::path::{Path, PathBuf};

/// Name of the negative-sample subdirectory.
pub const NEGATIVES_DIR: &str = "negatives";

/// Options for [`Database::load_dir`].
#[derive(Clone, Debug)]
pub struct LoadConfig {
    /// Calibration strictness in `[0, 1]`.
    pub strictness: f64,
    /// Add a left-right mirror of every template.
    pub mirror: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            strictness: 0.2,
            mirror: true,
        }
    }
}

/// Lists the visible image files of `dir`, sorted by file name.
pub fn image_files(dir: &Path) -> StacheResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| StacheError::io(dir, err))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StacheError::io(dir, err))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads every image in `dir/negatives`, or nothing if it does not exist.
pub fn load_negatives(dir: &Path) -> StacheResult<Vec<RasterImage>> {
    let neg_dir = dir.join(NEGATIVES_DIR);
    if !neg_dir.is_dir() {
        return Ok(Vec::new());
    }
    image_files(&neg_dir)?.iter().map(load_image).collect()
}

impl Database {
    /// Loads templates and negatives from a training directory.
    ///
    /// Any unreadable image or badly named template aborts the load.
    pub fn load_dir<P: AsRef<Path>>(dir: P, cfg: &LoadConfig) -> StacheResult<Database> {
        let dir = dir.as_ref();
        let _span = trace_span!("load_dir", mirror = cfg.mirror).entered();

        let negatives = load_negatives(dir)?;
        let mut db = Database::with_negatives(negatives, cfg.strictness)?;
        for path in image_files(dir)? {
            db.add_template(Template::from_file(&path)?)?;
        }
        if cfg.mirror {
            db.add_mirrors();
        }

        trace_event!(
            "database_loaded",
            templates = db.len(),
            negatives = db.negatives().len()
        );
        Ok(db)
    }
}
