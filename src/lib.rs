//! Stachematch locates mustache targets in photos by normalized
//! cross-correlation against a database of calibrated templates.
//!
//! Templates carry placement metadata for the overlay, thresholds are
//! calibrated against negative samples, and searches run over several image
//! scales. Row-parallel scanning and batch classification use the optional
//! `rayon` feature; spans and events are emitted with the `tracing` feature.

mod candidate;
pub mod classify;
pub mod database;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use classify::{classify_batch, classify_image, classify_matches, Category, Expectation};
pub use database::{Database, LoadConfig};
pub use crate::image::RasterImage;
pub use search::{elastic_search, Match, MatchSet, OverlapPolicy, SearchConfig};
pub use template::{Target, Template, TemplateId};
pub use util::{Point, StacheError, StacheResult};
