//! Tracking: given a star image (or its centroids), find the camera attitude.
//!
//! 1. Detect blobs; abort with `TooFewStars` below the configured minimum.
//! 2. Shuffle detections with a fixed seed.
//! 3. Draw up to `max_star_combos` triples in small-gap-first order.
//! 4. For each triple, match the triangle against the catalog, solve Wahba's
//!    problem for every consistent catalog triple and score the result.
//! 5. Keep the lowest score over all triples (ties go to the earlier draw).
//! 6. Re-solve on all inliers of the winner and change to the body basis.

use std::time::Instant;

use image::DynamicImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::centroid_extraction::extract_blobs_from_image;
use crate::{Centroid, StarCatalog, Vector3};

use super::combinations::GapOrderTriples;
use super::matching::match_triangle;
use super::verify::{Candidate, Validator};
use super::wahba::solve_wahba;
use super::{camera_from_body, TrackConfig, TrackError, TrackSolution};

impl StarCatalog {
    /// Determine the camera attitude from a star image.
    ///
    /// Blobs are detected with `config.blob`; the principal point is the image
    /// center and the focal length is `config.focal_length_px`.
    pub fn track(
        &self,
        image: &DynamicImage,
        config: &TrackConfig,
    ) -> Result<TrackSolution, TrackError> {
        let t0 = Instant::now();
        let detection = extract_blobs_from_image(image, &config.blob);
        self.track_inner(
            &detection.centroids,
            detection.image_width,
            detection.image_height,
            config,
            t0,
        )
    }

    /// Determine the camera attitude from already-detected centroids.
    ///
    /// Centroid (u, v) are in pixel coordinates with (0, 0) at the top-left
    /// pixel; `image_width` and `image_height` locate the principal point.
    pub fn track_from_centroids(
        &self,
        centroids: &[Centroid],
        image_width: u32,
        image_height: u32,
        config: &TrackConfig,
    ) -> Result<TrackSolution, TrackError> {
        self.track_inner(centroids, image_width, image_height, config, Instant::now())
    }

    fn track_inner(
        &self,
        centroids: &[Centroid],
        image_width: u32,
        image_height: u32,
        config: &TrackConfig,
        t0: Instant,
    ) -> Result<TrackSolution, TrackError> {
        let n = centroids.len();
        if n < config.min_stars {
            debug!("Only {} stars detected, need {}", n, config.min_stars);
            return Err(TrackError::TooFewStars { count: n });
        }

        // ── Shuffle so gap order is not tied to raster position ──
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(config.shuffle_seed));
        let shuffled: Vec<Centroid> = order.iter().map(|&i| centroids[i]).collect();

        let camera = config.camera_model(image_width, image_height);
        let rays: Vec<Vector3> = shuffled.iter().map(|c| c.ray(&camera)).collect();
        let validator = Validator::new(
            self,
            &camera,
            &shuffled,
            &rays,
            config.max_reprojection_px,
            config.min_inlier_fraction,
        );

        let triples: Vec<(usize, usize, usize)> = GapOrderTriples::new(n)
            .take(config.max_star_combos)
            .collect();
        debug!(
            "Tracking with {} stars, {} triples, {} inliers required",
            n,
            triples.len(),
            validator.min_inliers()
        );

        // ── Evaluate every triple, then reduce to the best candidate ──
        let evaluate = |(draw, &(i, j, k)): (usize, &(usize, usize, usize))| {
            self.best_for_triple(&validator, [rays[i], rays[j], rays[k]], config)
                .map(|c| (draw, c))
        };
        let best = if config.parallel {
            triples
                .par_iter()
                .enumerate()
                .filter_map(evaluate)
                .reduce_with(better)
        } else {
            triples.iter().enumerate().filter_map(evaluate).reduce(better)
        };

        let Some((draw, best)) = best else {
            debug!("No candidate after {} triples", triples.len());
            return Err(TrackError::NoGoodMatches);
        };
        debug!(
            "Best candidate from draw {}: score {:.3} px², {} inliers",
            draw,
            best.score,
            best.inliers.len()
        );

        // ── Refine on the full inlier set ──
        let refined = solve_wahba(&best.inliers).unwrap_or(best.rotation);

        let sq_errors: Vec<f64> = best
            .inliers
            .iter()
            .zip(&best.detections)
            .filter_map(|(c, &d)| {
                let (u, v) = camera.project_reference(&refined, &c.catalog)?;
                Some(shuffled[d].distance_squared(u, v))
            })
            .collect();
        let rms_reprojection_px = if sq_errors.is_empty() {
            0.0
        } else {
            (sq_errors.iter().sum::<f64>() / sq_errors.len() as f64).sqrt()
        };

        Ok(TrackSolution {
            reference_from_body: refined.matrix().transpose() * camera_from_body(),
            camera_from_reference: refined,
            score: best.score,
            num_inliers: best.inliers.len(),
            matched_catalog_ids: best.inliers.iter().map(|c| c.catalog_id).collect(),
            matched_centroid_indices: best.detections.iter().map(|&d| order[d]).collect(),
            rms_reprojection_px,
            num_blobs: n,
            num_combos_tried: triples.len(),
            solve_time_ms: elapsed_ms(t0),
        })
    }

    /// Best-scoring candidate among all catalog triples consistent with one detection triple.
    fn best_for_triple(
        &self,
        validator: &Validator,
        observed: [Vector3; 3],
        config: &TrackConfig,
    ) -> Option<Candidate> {
        match_triangle(self, &observed, config.angle_tolerance_rad)
            .iter()
            .filter_map(|m| solve_wahba(m))
            .filter_map(|rotation| validator.score(&rotation))
            .reduce(|a, b| if b.score < a.score { b } else { a })
    }
}

/// Lower score wins; equal scores go to the earlier draw.
fn better(a: (usize, Candidate), b: (usize, Candidate)) -> (usize, Candidate) {
    if b.1.score < a.1.score || (b.1.score == a.1.score && b.0 < a.0) {
        b
    } else {
        a
    }
}

fn elapsed_ms(t0: Instant) -> f32 {
    t0.elapsed().as_secs_f32() * 1000.0
}
