//! Candidate ordering and pruning utilities.
//!
//! Includes scan peaks with deterministic ordering and greedy non-maximum
//! suppression.

pub(crate) mod nms;
pub(crate) mod peak;
