//! End-to-end tests: render a synthetic sky from a random catalog at a known
//! attitude, then check the tracker recovers that attitude from the image.

use image::{DynamicImage, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use startracker::solver::camera_from_body;
use startracker::solver::verify::Validator;
use startracker::synthetic::{render_star_field, PlacedStar, SyntheticConfig};
use startracker::{
    angle_between, CameraModel, CatalogConfig, CatalogStar, CatalogTables, Centroid, Rotation,
    StarCatalog, TrackConfig, TrackError, Vector3,
};

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;
const FOCAL_PX: f64 = 600.0;

/// Uniformly random stars at least `min_sep_deg` apart.
fn random_sky(seed: u64, n: usize, min_sep_deg: f64) -> Vec<CatalogStar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let min_sep = min_sep_deg.to_radians();
    let mut stars: Vec<CatalogStar> = Vec::with_capacity(n);
    while stars.len() < n {
        let z: f64 = rng.random::<f64>() * 2.0 - 1.0;
        let ra: f64 = rng.random::<f64>() * std::f64::consts::TAU;
        let candidate = CatalogStar::from_radec(stars.len() as u64 + 1, ra, z.asin());
        if stars
            .iter()
            .all(|s| angle_between(&s.uvec(), &candidate.uvec()) > min_sep)
        {
            stars.push(candidate);
        }
    }
    stars
}

fn build_catalog() -> StarCatalog {
    let stars = random_sky(2024, 400, 3.0);
    let tables = CatalogTables::generate(stars, &CatalogConfig::default());
    StarCatalog::build(&tables).expect("Failed to build catalog")
}

fn camera() -> CameraModel {
    CameraModel::from_image_size(FOCAL_PX, WIDTH, HEIGHT)
}

fn render(catalog: &StarCatalog, truth: &Rotation) -> (RgbImage, Vec<PlacedStar>) {
    render_star_field(
        catalog,
        &camera(),
        truth,
        WIDTH,
        HEIGHT,
        &SyntheticConfig::default(),
    )
}

#[test]
fn test_track_synthetic_image() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let catalog = build_catalog();
    let truth = Rotation::from_euler_angles(0.4, -0.3, 1.2);
    let (img, placed) = render(&catalog, &truth);
    println!("Rendered {} stars", placed.len());
    assert!(placed.len() >= 8, "too few stars in view: {}", placed.len());

    let config = TrackConfig::new(FOCAL_PX, 300);
    let solution = catalog
        .track(&DynamicImage::ImageRgb8(img), &config)
        .expect("Tracking failed");

    println!(
        "Solved: {} inliers of {} blobs, score {:.3} px², rms {:.3} px, {} combos, {:.1} ms",
        solution.num_inliers,
        solution.num_blobs,
        solution.score,
        solution.rms_reprojection_px,
        solution.num_combos_tried,
        solution.solve_time_ms
    );

    assert_eq!(solution.num_blobs, placed.len());
    assert!(solution.num_inliers as f64 >= 0.85 * placed.len() as f64);
    assert!(solution.rms_reprojection_px < 1.0);

    // Every synthetic placement reprojects close to where it was drawn
    let cam = camera();
    for p in &placed {
        let dir = catalog.star(p.id).unwrap().uvec();
        let (u, v) = solution.project(&cam, &dir).expect("star behind camera");
        let err = ((u - p.u).powi(2) + (v - p.v).powi(2)).sqrt();
        assert!(err < 5.0, "star {} reprojects {:.2} px away", p.id, err);
    }

    let angle_err = solution.camera_from_reference.angle_to(&truth);
    assert!(angle_err < 2e-3, "attitude error {:.2e} rad", angle_err);

    // Output frame is the body basis
    let expected = truth.matrix().transpose() * camera_from_body();
    assert!((solution.reference_from_body - expected).abs().max() < 2e-3);
    let m = solution.reference_from_body;
    assert!((m.determinant() - 1.0).abs() < 1e-9);
    assert!((m * m.transpose() - startracker::Matrix3::identity()).norm() < 1e-9);

    // Body +X is the boresight
    let boresight = truth.inverse() * Vector3::z();
    assert!(angle_between(&(m * Vector3::x()), &boresight) < 2e-3);
    assert!(angle_between(&solution.boresight(), &boresight) < 2e-3);
}

#[test]
fn test_track_from_centroids_with_spurious_detections() {
    let catalog = build_catalog();
    let truth = Rotation::from_euler_angles(-1.0, 0.6, -2.2);
    let cam = camera();
    let (_, placed) = render(&catalog, &truth);
    assert!(placed.len() >= 12, "too few stars in view: {}", placed.len());

    let mut centroids: Vec<Centroid> = placed.iter().map(|p| Centroid::new(p.u, p.v)).collect();

    // Two detections far from the projection of any catalog star
    let projections: Vec<(f64, f64)> = catalog
        .stars()
        .iter()
        .filter_map(|s| cam.project_reference(&truth, &s.uvec()))
        .collect();
    let mut fakes = Vec::new();
    'grid: for gy in (40..HEIGHT - 40).step_by(37) {
        for gx in (40..WIDTH - 40).step_by(41) {
            let (u, v) = (gx as f64, gy as f64);
            if projections
                .iter()
                .all(|&(pu, pv)| (pu - u).powi(2) + (pv - v).powi(2) > 60.0 * 60.0)
            {
                fakes.push(Centroid::new(u, v));
                if fakes.len() == 2 {
                    break 'grid;
                }
            }
        }
    }
    assert_eq!(fakes.len(), 2);
    let first_fake = centroids.len();
    centroids.extend(fakes);

    let config = TrackConfig::new(FOCAL_PX, 300);
    let solution = catalog
        .track_from_centroids(&centroids, WIDTH, HEIGHT, &config)
        .expect("Tracking failed");

    assert_eq!(solution.num_inliers, placed.len());
    assert!(solution
        .matched_centroid_indices
        .iter()
        .all(|&i| i < first_fake));
    for (&idx, &id) in solution
        .matched_centroid_indices
        .iter()
        .zip(&solution.matched_catalog_ids)
    {
        assert_eq!(placed[idx].id, id);
    }
    assert!(solution.camera_from_reference.angle_to(&truth) < 2e-3);

    // `score` belongs to the three-star candidate; the RMS error belongs to
    // the rotation refined on all inliers.
    let rays: Vec<Vector3> = centroids.iter().map(|c| c.ray(&cam)).collect();
    let validator = Validator::new(&catalog, &cam, &centroids, &rays, 10.0, 0.85);
    let refined = validator
        .score(&solution.camera_from_reference)
        .expect("refined rotation rejected");
    assert_eq!(refined.inliers.len(), solution.num_inliers);
    let rms_sq = solution.rms_reprojection_px.powi(2);
    assert!((refined.score - rms_sq).abs() < 1e-9);
    assert_ne!(solution.score, refined.score);
    assert!(solution.score < 10.0 * 10.0);
}

#[test]
fn test_blank_image_too_few_stars() {
    let catalog = build_catalog();
    let img = DynamicImage::ImageRgb8(RgbImage::new(WIDTH, HEIGHT));
    let result = catalog.track(&img, &TrackConfig::new(FOCAL_PX, 100));
    assert_eq!(result.unwrap_err(), TrackError::TooFewStars { count: 0 });
}

#[test]
fn test_too_few_centroids() {
    let catalog = build_catalog();
    let centroids = [
        Centroid::new(100.0, 100.0),
        Centroid::new(300.0, 200.0),
        Centroid::new(500.0, 400.0),
    ];
    let config = TrackConfig::new(FOCAL_PX, 100);
    let result = catalog.track_from_centroids(&centroids, WIDTH, HEIGHT, &config);
    assert_eq!(result.unwrap_err(), TrackError::TooFewStars { count: 3 });
}

#[test]
fn test_random_centroids_no_good_matches() {
    let catalog = build_catalog();
    let mut rng = StdRng::seed_from_u64(77);
    let centroids: Vec<Centroid> = (0..12)
        .map(|_| {
            Centroid::new(
                rng.random_range(20.0..WIDTH as f64 - 20.0),
                rng.random_range(20.0..HEIGHT as f64 - 20.0),
            )
        })
        .collect();
    let result =
        catalog.track_from_centroids(&centroids, WIDTH, HEIGHT, &TrackConfig::new(FOCAL_PX, 220));
    assert_eq!(result.unwrap_err(), TrackError::NoGoodMatches);
}

#[test]
fn test_repeatable_and_parallel_matches_sequential() {
    let catalog = build_catalog();
    let truth = Rotation::from_euler_angles(2.1, 0.2, 0.3);
    let (img, _) = render(&catalog, &truth);
    let img = DynamicImage::ImageRgb8(img);

    let parallel = TrackConfig::new(FOCAL_PX, 200);
    let sequential = TrackConfig {
        parallel: false,
        ..TrackConfig::new(FOCAL_PX, 200)
    };

    let a = catalog.track(&img, &parallel).expect("Tracking failed");
    let b = catalog.track(&img, &parallel).expect("Tracking failed");
    let c = catalog.track(&img, &sequential).expect("Tracking failed");

    for other in [&b, &c] {
        assert_eq!(a.reference_from_body, other.reference_from_body);
        assert_eq!(a.score, other.score);
        assert_eq!(a.matched_catalog_ids, other.matched_catalog_ids);
        assert_eq!(a.matched_centroid_indices, other.matched_centroid_indices);
    }
}
