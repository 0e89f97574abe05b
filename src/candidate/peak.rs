//! Correlation peaks reported by the scan kernels.

/// A window whose correlation passed the scan threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the window's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the window's top-left corner.
    pub y: usize,
    /// Normalized correlation in `[0, 1]`.
    pub score: f64,
}
