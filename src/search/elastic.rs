//! Multi-scale search over rescaled copies of the input image.

use crate::database::Database;
use crate::image::resize::scale_to_long_edge;
use crate::image::RasterImage;
use crate::search::{MatchSet, SearchConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::StacheResult;

/// Long-edge sizes tried when the caller does not pick any.
///
/// Large sizes are left out: targets are usually found at small scales and
/// the smaller images are much cheaper to scan.
pub const DEFAULT_ELASTIC_SIZES: [usize; 16] = [
    400, 370, 340, 310, 280, 250, 220, 205, 190, 175, 160, 145, 130, 115, 100, 85,
];

/// Searches `image` at several scales and merges the results.
///
/// For every size `S` the image is resized so its longer side is `S`, the
/// database is searched, and match geometry is mapped back to the original
/// frame. The merged set goes through one final non-maximum suppression.
pub fn elastic_search(
    db: &Database,
    image: &RasterImage,
    sizes: Option<&[usize]>,
    cfg: &SearchConfig,
) -> StacheResult<MatchSet> {
    let sizes = sizes.unwrap_or(&DEFAULT_ELASTIC_SIZES);
    let _span = trace_span!(
        "elastic_search",
        width = image.width(),
        height = image.height(),
        scales = sizes.len()
    )
    .entered();

    let mut merged = MatchSet::new();
    for &size in sizes {
        let (scaled, scale) = scale_to_long_edge(image, size)?;
        let found = db.search(&scaled, cfg);
        trace_event!("elastic_scale", size = size, matches = found.len());
        merged.extend(found.into_iter().map(|m| m.unscaled(scale)));
    }

    let result = merged.into_non_overlapping(cfg.overlap);
    trace_event!("elastic_done", matches = result.len());
    Ok(result)
}
