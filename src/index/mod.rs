//! Catalog indices built once at load time and shared read-only afterwards.
//!
//! - [`KVector`]: range queries over the sorted pair-angle table.
//! - [`KdTree`]: nearest-neighbor queries over catalog star directions.

pub mod kdtree;
pub mod kvector;

pub use kdtree::KdTree;
pub use kvector::{KVector, RangeKey};
