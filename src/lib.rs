//! # startracker
//!
//! A **lost-in-space star tracker** written in Rust.
//!
//! Given a single image of the night sky, `startracker` identifies the stars
//! against a catalog and returns the camera's orientation relative to the
//! celestial reference frame, with no prior attitude estimate.
//!
//! ## Features
//!
//! - **Blob detection** with an adaptive threshold, contrast and corner checks
//! - **K-vector angle index** for near-constant-time pair-angle range queries
//! - **k-d tree** nearest-star lookup for validation
//! - **Triangle matching** with deterministic, insertion-ordered candidate sets
//! - **Wahba/SVD** attitude solve with a guaranteed proper rotation
//! - **Parallel** candidate evaluation with [rayon](https://docs.rs/rayon),
//!   bit-identical to the sequential path
//! - **Zero-copy persistence** of catalog tables with [rkyv](https://docs.rs/rkyv)
//!
//! ## Example
//!
//! ```no_run
//! use startracker::{
//!     load_star_table, CatalogConfig, CatalogTables, StarCatalog, TrackConfig,
//! };
//!
//! // Build the pair table once and save it for fast loading later
//! let stars = load_star_table("data/stars.txt").unwrap();
//! let tables = CatalogTables::generate(stars, &CatalogConfig::default());
//! tables.save_to_file("data/catalog.rkyv").unwrap();
//!
//! let tables = CatalogTables::load_from_file("data/catalog.rkyv").unwrap();
//! let catalog = StarCatalog::build(&tables).unwrap();
//!
//! let image = image::open("sky.png").unwrap();
//! let config = TrackConfig::new(2000.0, 500);
//! match catalog.track(&image, &config) {
//!     Ok(solution) => {
//!         println!("Attitude: {}", solution.reference_from_body);
//!         println!("Matched {} stars in {:.1} ms", solution.num_inliers, solution.solve_time_ms);
//!     }
//!     Err(e) => println!("No attitude: {e}"),
//! }
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Detection**: find bright, compact blobs and compute their centroids
//! 2. **Candidate generation**: shuffle detections with a fixed seed and draw
//!    index triples in small-gap-first order
//! 3. **Triangle matching**: query the angle index for each side of the
//!    triangle and intersect the hits into consistent catalog triples
//! 4. **Attitude estimation**: solve Wahba's problem via SVD per catalog triple
//! 5. **Validation**: snap every detection to its nearest catalog star,
//!    reproject, and score by mean squared pixel error over inliers
//! 6. **Refinement**: re-solve on all inliers of the best candidate
//!

pub mod camera_model;
mod centroid;
pub mod centroid_extraction;
pub mod index;
pub mod solver;
pub mod star;
pub mod starcatalog;
pub mod synthetic;

pub use camera_model::CameraModel;
pub use centroid::*;
pub use centroid_extraction::{
    extract_blobs, extract_blobs_from_gray, extract_blobs_from_image, BlobDetectionConfig,
    BlobDetectionResult,
};
pub use solver::{Correspondence, TrackConfig, TrackError, TrackSolution};
pub use star::*;
pub use starcatalog::*;

// Commonly used types
// All geometry is f64; the reprojection threshold is a few pixels at focal
// lengths of thousands of pixels.
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
pub type Rotation = nalgebra::Rotation3<f64>;
