//! Lost-in-space attitude determination from a single star image.
//!
//! Given detected star centroids and an indexed catalog, the tracker:
//!
//! 1. **Candidate generation**: draws detection triples in small-gap-first
//!    order from a deterministically shuffled detection list.
//! 2. **Triangle matching**: looks up catalog pairs whose separation matches
//!    each side of the triangle and keeps the catalog triples consistent on
//!    all three sides.
//! 3. **Attitude estimation**: solves Wahba's problem via SVD for each
//!    consistent triple.
//! 4. **Validation**: reprojects the nearest catalog star of every detection
//!    and scores the candidate by its mean squared pixel error over inliers.
//! 5. **Refinement**: re-solves Wahba's problem on all inliers of the best
//!    candidate.

pub mod combinations;
pub mod matching;
pub mod track;
pub mod verify;
pub mod wahba;

use crate::camera_model::CameraModel;
use crate::centroid_extraction::BlobDetectionConfig;
use crate::{Matrix3, Rotation, Vector3};

// ── Correspondences ─────────────────────────────────────────────────────────

/// An observed camera-frame direction paired with a catalog direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Unit vector in the camera frame.
    pub observed: Vector3,
    /// Unit vector in the reference frame.
    pub catalog: Vector3,
    /// Catalog id of the matched star.
    pub catalog_id: u64,
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Terminal failures of a tracking run. Neither is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    /// Detection produced fewer stars than `TrackConfig::min_stars`.
    #[error("too few stars detected ({count})")]
    TooFewStars { count: usize },
    /// No candidate attitude had a single inlier after the whole budget.
    #[error("no candidate attitude matched the detected stars")]
    NoGoodMatches,
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters controlling a tracking run.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Focal length in pixels. The principal point is the image center.
    /// Must be set; see [`TrackConfig::new`].
    pub focal_length_px: f64,
    /// Maximum number of detection triples evaluated.
    /// Default: 1000.
    pub max_star_combos: usize,
    /// Minimum number of detected stars required to attempt matching.
    /// Default: 4.
    pub min_stars: usize,
    /// Half-width of the window around each measured triangle side used to
    /// query the pair index, in radians.
    /// Default: 0.004.
    pub angle_tolerance_rad: f64,
    /// Maximum reprojection error for an inlier, in pixels.
    /// Default: 10.
    pub max_reprojection_px: f64,
    /// Fraction of detections that must be inliers for a candidate to be kept.
    /// Default: 0.85.
    pub min_inlier_fraction: f64,
    /// Seed for the detection shuffle.
    /// Default: 0.
    pub shuffle_seed: u64,
    /// Evaluate triples on the rayon thread pool. The result does not depend
    /// on this flag.
    /// Default: true.
    pub parallel: bool,
    /// Blob detection parameters used by [`StarCatalog::track`](crate::StarCatalog::track).
    pub blob: BlobDetectionConfig,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            focal_length_px: 0.0,
            max_star_combos: 1000,
            min_stars: 4,
            angle_tolerance_rad: 0.004,
            max_reprojection_px: 10.0,
            min_inlier_fraction: 0.85,
            shuffle_seed: 0,
            parallel: true,
            blob: BlobDetectionConfig::default(),
        }
    }
}

impl TrackConfig {
    /// Create a tracking configuration with the given focal length (pixels) and triple budget.
    pub fn new(focal_length_px: f64, max_star_combos: usize) -> Self {
        Self {
            focal_length_px,
            max_star_combos,
            ..Default::default()
        }
    }

    /// Camera model for an image of the given size.
    pub fn camera_model(&self, image_width: u32, image_height: u32) -> CameraModel {
        CameraModel::from_image_size(self.focal_length_px, image_width, image_height)
    }
}

// ── Solution ────────────────────────────────────────────────────────────────

/// Fixed change of basis from the body frame (+X boresight, +Y left, +Z up)
/// to the camera frame (+X right, +Y down, +Z boresight).
pub const CAMERA_FROM_BODY: [[f64; 3]; 3] = [[0.0, -1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]];

/// Matrix form of [`CAMERA_FROM_BODY`].
pub fn camera_from_body() -> Matrix3 {
    let m = CAMERA_FROM_BODY;
    Matrix3::new(
        m[0][0], m[0][1], m[0][2], //
        m[1][0], m[1][1], m[1][2], //
        m[2][0], m[2][1], m[2][2],
    )
}

/// Successful tracking result.
#[derive(Debug, Clone)]
pub struct TrackSolution {
    /// Rotation taking body-frame vectors (+X boresight, +Y left, +Z up) to
    /// reference-frame vectors.
    /// Usage: `reference_vec = reference_from_body * body_vec`
    pub reference_from_body: Matrix3,
    /// Rotation taking reference-frame vectors to camera-frame vectors
    /// (+X right, +Y down, +Z boresight).
    /// Usage: `camera_vec = camera_from_reference * reference_vec`
    pub camera_from_reference: Rotation,
    /// Mean squared reprojection error over inliers of the winning candidate, in pixels².
    /// Computed for the three-star rotation before refinement; see
    /// `rms_reprojection_px` for the refined fit.
    pub score: f64,
    /// Number of inliers used for the final solve.
    pub num_inliers: usize,
    /// Catalog ids of the inliers.
    pub matched_catalog_ids: Vec<u64>,
    /// Indices into the input centroid slice for each inlier.
    pub matched_centroid_indices: Vec<usize>,
    /// RMS reprojection error of the inliers under the refined rotation, in pixels.
    pub rms_reprojection_px: f64,
    /// Number of detected stars.
    pub num_blobs: usize,
    /// Number of detection triples evaluated.
    pub num_combos_tried: usize,
    /// Wall-clock time spent, in milliseconds.
    pub solve_time_ms: f32,
}

impl TrackSolution {
    /// Boresight direction in the reference frame.
    pub fn boresight(&self) -> Vector3 {
        self.camera_from_reference.inverse() * Vector3::z()
    }

    /// Project a reference-frame direction to pixel coordinates.
    ///
    /// Returns `None` if the direction is behind the camera.
    pub fn project(&self, camera: &CameraModel, ref_vec: &Vector3) -> Option<(f64, f64)> {
        camera.project_reference(&self.camera_from_reference, ref_vec)
    }
}
