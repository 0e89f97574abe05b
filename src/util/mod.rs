//! Shared utility helpers.

pub mod error;
pub mod math;

pub use error::{StacheError, StacheResult};
pub use math::Point;
