//! Candidate attitude validation by reprojection.
//!
//! Every detection is rotated into the reference frame, snapped to its nearest
//! catalog star, and that star is projected back into the image. Detections
//! whose reprojection lands within the pixel threshold are inliers; the score
//! is the mean squared pixel error over inliers only.

use crate::camera_model::CameraModel;
use crate::{Centroid, Rotation, StarCatalog, Vector3};

use super::Correspondence;

/// A scored candidate attitude.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Rotation taking reference-frame vectors to camera-frame vectors.
    pub rotation: Rotation,
    /// Mean squared reprojection error over inliers, in pixels².
    pub score: f64,
    /// Inlier correspondences, in detection order.
    pub inliers: Vec<Correspondence>,
    /// Index of the detection behind each inlier.
    pub detections: Vec<usize>,
}

/// Scores candidate rotations against a fixed set of detections.
pub struct Validator<'a> {
    catalog: &'a StarCatalog,
    camera: &'a CameraModel,
    centroids: &'a [Centroid],
    rays: &'a [Vector3],
    max_error_sq: f64,
    min_inliers: usize,
}

impl<'a> Validator<'a> {
    /// `rays[i]` must be the camera-frame direction of `centroids[i]`.
    pub fn new(
        catalog: &'a StarCatalog,
        camera: &'a CameraModel,
        centroids: &'a [Centroid],
        rays: &'a [Vector3],
        max_reprojection_px: f64,
        min_inlier_fraction: f64,
    ) -> Self {
        let min_inliers = ((min_inlier_fraction * centroids.len() as f64).ceil() as usize).max(1);
        Self {
            catalog,
            camera,
            centroids,
            rays,
            max_error_sq: max_reprojection_px * max_reprojection_px,
            min_inliers,
        }
    }

    /// Minimum inlier count for a candidate to be kept.
    pub fn min_inliers(&self) -> usize {
        self.min_inliers
    }

    /// Score `rotation`, or `None` if it cannot reach the inlier requirement.
    ///
    /// Stops as soon as the remaining detections can no longer make up the
    /// required inlier count.
    pub fn score(&self, rotation: &Rotation) -> Option<Candidate> {
        let n = self.centroids.len();
        if n < self.min_inliers {
            return None;
        }
        let max_misses = n - self.min_inliers;
        let to_reference = rotation.inverse();

        let mut misses = 0;
        let mut sum_sq = 0.0;
        let mut inliers = Vec::with_capacity(n);
        let mut detections = Vec::with_capacity(n);

        for (i, (centroid, ray)) in self.centroids.iter().zip(self.rays).enumerate() {
            let error_sq = self
                .catalog
                .nearest_star(&(to_reference * ray), None)
                .and_then(|star| {
                    let (u, v) = self.camera.project_reference(rotation, &star.uvec())?;
                    Some((star, centroid.distance_squared(u, v)))
                })
                .filter(|&(_, d2)| d2 < self.max_error_sq);

            match error_sq {
                Some((star, d2)) => {
                    sum_sq += d2;
                    inliers.push(Correspondence {
                        observed: *ray,
                        catalog: star.uvec(),
                        catalog_id: star.id,
                    });
                    detections.push(i);
                }
                None => {
                    misses += 1;
                    if misses > max_misses {
                        return None;
                    }
                }
            }
        }

        if inliers.is_empty() {
            return None;
        }
        Some(Candidate {
            rotation: *rotation,
            score: sum_sq / inliers.len() as f64,
            inliers,
            detections,
        })
    }
}
