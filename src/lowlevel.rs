//! Low-level building blocks for custom search pipelines.
//!
//! These expose the scan kernels, raw peaks and the generic suppression
//! routine used by [`crate::Database::search`]. Most users should prefer the
//! top-level `Database` and `elastic_search` API.

pub use crate::candidate::nms::suppress;
pub use crate::candidate::peak::Peak;
pub use crate::database::calibrate::{
    calibrated_threshold, max_negative_correlation, pair_threshold, template_threshold,
};
#[cfg(feature = "rayon")]
pub use crate::kernel::rayon::NccRollingPar;
pub use crate::kernel::scalar::{score_at, NccRollingScalar};
pub use crate::kernel::{Kernel, ScanParams};
pub use crate::search::search_template;
pub use crate::template::TemplateStats;
