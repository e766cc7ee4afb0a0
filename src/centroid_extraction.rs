//! Extract star centroids from a night-sky image.
//!
//! Detection runs in a single raster pass over an 8-bit grayscale plane:
//! 1. Estimate a global bright-pixel threshold from the median of a seeded
//!    random pixel sample plus a fixed margin
//! 2. Scan pixels (optionally strided) that are above threshold and not yet visited
//! 3. Require local contrast against pixels a fixed offset away, so smooth
//!    gradients never seed a blob
//! 4. Flood-fill the blob through an expanded neighborhood window using a
//!    threshold halfway between the seed intensity and the global threshold
//! 5. Keep blobs whose pixel count is in range and whose expanded bounding-box
//!    corners are clearly darker than the blob itself
//! 6. Emit the intensity-weighted centroid of each kept blob
//!
//! # Example
//!
//! ```no_run
//! use startracker::centroid_extraction::{BlobDetectionConfig, extract_blobs};
//!
//! let config = BlobDetectionConfig::default();
//!
//! let result = extract_blobs("my_star_image.png", &config).unwrap();
//! println!("Found {} stars", result.centroids.len());
//! ```

use crate::centroid::Centroid;
use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Configuration for blob detection.
#[derive(Debug, Clone)]
pub struct BlobDetectionConfig {
    /// Raster scan step in both directions. Stars must be at least this wide
    /// to be guaranteed a seed pixel.
    /// Default: 2
    pub scan_stride: usize,

    /// Number of randomly sampled pixels used to estimate the background median.
    /// Zero uses every pixel.
    /// Default: 1000
    pub sample_size: usize,

    /// Seed for the pixel sample, so detection is repeatable.
    /// Default: 0
    pub sample_seed: u64,

    /// Added to the sampled median to get the bright-pixel threshold.
    /// Default: 40
    pub threshold_margin: f64,

    /// Distance in pixels to the neighbors used for the contrast check.
    /// Default: 6
    pub contrast_offset: usize,

    /// A seed pixel must exceed both horizontal (or both vertical) contrast
    /// neighbors by more than this.
    /// Default: 20
    pub contrast_delta: f64,

    /// Half-width of the flood-fill neighborhood window. Pixels up to this far
    /// apart along either axis are treated as connected.
    /// Default: 2
    pub fill_radius: usize,

    /// Minimum number of pixels in a blob. Rejects hot pixels.
    /// Default: 6
    pub min_pixels: usize,

    /// Maximum number of pixels in a blob. The flood fill stops as soon as a
    /// blob grows past this, which bounds the work spent on clouds and glare.
    /// Default: 1000
    pub max_pixels: usize,

    /// Margin added around the blob bounding box before sampling its corners.
    /// Corners that fall outside the image count as dark, so stars touching
    /// the edge are kept.
    /// Default: 3
    pub corner_margin: usize,

    /// Each expanded corner must be darker than the blob mean by more than this.
    /// Default: 20
    pub corner_delta: f64,
}

impl Default for BlobDetectionConfig {
    fn default() -> Self {
        Self {
            scan_stride: 2,
            sample_size: 1000,
            sample_seed: 0,
            threshold_margin: 40.0,
            contrast_offset: 6,
            contrast_delta: 20.0,
            fill_radius: 2,
            min_pixels: 6,
            max_pixels: 1000,
            corner_margin: 3,
            corner_delta: 20.0,
        }
    }
}

/// Result of blob detection, containing the centroids and diagnostic info.
#[derive(Debug, Clone)]
pub struct BlobDetectionResult {
    /// Detected centroids in raster order of their seed pixel.
    /// Pixel coordinates with (0, 0) at the top-left pixel center.
    pub centroids: Vec<Centroid>,

    /// Global bright-pixel threshold used for seeding.
    pub threshold: f64,

    /// Number of flood fills started, before size and corner filtering.
    pub num_blobs_raw: usize,

    /// Image width in pixels.
    pub image_width: u32,

    /// Image height in pixels.
    pub image_height: u32,
}

/// Detect stars in an image file.
///
/// # Arguments
///
/// * `path` - Path to the image file (any format the `image` crate decodes)
/// * `config` - Detection parameters
pub fn extract_blobs(
    path: impl AsRef<std::path::Path>,
    config: &BlobDetectionConfig,
) -> Result<BlobDetectionResult> {
    let img = image::open(path.as_ref())
        .with_context(|| format!("Failed to open image: {}", path.as_ref().display()))?;
    Ok(extract_blobs_from_image(&img, config))
}

/// Detect stars in an already-loaded [`DynamicImage`].
///
/// Color rasters are reduced to 8-bit luma first.
pub fn extract_blobs_from_image(
    img: &DynamicImage,
    config: &BlobDetectionConfig,
) -> BlobDetectionResult {
    extract_blobs_from_gray(&to_grayscale(img), config)
}

/// 8-bit luma plane used by the detector.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Detect stars in an 8-bit grayscale image.
pub fn extract_blobs_from_gray(gray: &GrayImage, config: &BlobDetectionConfig) -> BlobDetectionResult {
    let (width, height) = gray.dimensions();
    let plane = Plane {
        pixels: gray.as_raw(),
        width: width as usize,
        height: height as usize,
    };

    if plane.pixels.is_empty() {
        return BlobDetectionResult {
            centroids: Vec::new(),
            threshold: 0.0,
            num_blobs_raw: 0,
            image_width: width,
            image_height: height,
        };
    }

    let threshold = estimate_threshold(&plane, config);
    let stride = config.scan_stride.max(1);

    let mut visited = vec![false; plane.pixels.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut blob: Vec<(usize, usize)> = Vec::new();
    let mut centroids = Vec::new();
    let mut num_blobs_raw = 0;

    for y in (0..plane.height).step_by(stride) {
        for x in (0..plane.width).step_by(stride) {
            if visited[y * plane.width + x] {
                continue;
            }
            let seed = plane.at(x, y);
            if seed <= threshold || !plane.passes_contrast(x, y, config) {
                continue;
            }

            num_blobs_raw += 1;
            let local_threshold = (seed + threshold) / 2.0;
            flood_fill(
                &plane,
                (x, y),
                local_threshold,
                config,
                &mut visited,
                &mut stack,
                &mut blob,
            );
            if let Some(c) = evaluate_blob(&plane, &blob, config) {
                centroids.push(c);
            }
        }
    }

    tracing::debug!(
        "Blob detection: threshold {:.1}, {} fills, {} stars",
        threshold,
        num_blobs_raw,
        centroids.len()
    );

    BlobDetectionResult {
        centroids,
        threshold,
        num_blobs_raw,
        image_width: width,
        image_height: height,
    }
}

// ─── Internal helpers ──────────────────────────────────────────────────────

/// Borrowed row-major luma plane.
struct Plane<'a> {
    pixels: &'a [u8],
    width: usize,
    height: usize,
}

impl Plane<'_> {
    fn at(&self, x: usize, y: usize) -> f64 {
        self.pixels[y * self.width + x] as f64
    }

    /// Pixel value, or 0 outside the image.
    fn at_signed(&self, x: isize, y: isize) -> f64 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            0.0
        } else {
            self.at(x as usize, y as usize)
        }
    }

    fn passes_contrast(&self, x: usize, y: usize, config: &BlobDetectionConfig) -> bool {
        let p = self.at(x, y);
        let d = config.contrast_offset as isize;
        let (xi, yi) = (x as isize, y as isize);
        let brighter = |q: f64| p > q + config.contrast_delta;

        let horizontal = brighter(self.at_signed(xi - d, yi)) && brighter(self.at_signed(xi + d, yi));
        let vertical = brighter(self.at_signed(xi, yi - d)) && brighter(self.at_signed(xi, yi + d));
        horizontal || vertical
    }
}

/// Median of a seeded pixel sample plus the configured margin.
fn estimate_threshold(plane: &Plane, config: &BlobDetectionConfig) -> f64 {
    let mut sample: Vec<u8> = if config.sample_size == 0 {
        plane.pixels.to_vec()
    } else {
        let mut rng = StdRng::seed_from_u64(config.sample_seed);
        (0..config.sample_size)
            .map(|_| plane.pixels[rng.random_range(0..plane.pixels.len())])
            .collect()
    };
    sample.sort_unstable();
    sample[sample.len() / 2] as f64 + config.threshold_margin
}

/// Collect the pixels connected to `seed` that are brighter than `local_threshold`.
///
/// Every pixel examined inside a window is marked visited whether or not it
/// joins the blob, so the dim halo of a star never seeds a second fill. Pixels
/// still on the stack when the fill stops at `max_pixels + 1` stay visited too.
fn flood_fill(
    plane: &Plane,
    seed: (usize, usize),
    local_threshold: f64,
    config: &BlobDetectionConfig,
    visited: &mut [bool],
    stack: &mut Vec<(usize, usize)>,
    blob: &mut Vec<(usize, usize)>,
) {
    let w = plane.width;
    let r = config.fill_radius as isize;

    stack.clear();
    blob.clear();
    visited[seed.1 * w + seed.0] = true;
    stack.push(seed);

    while let Some((x, y)) = stack.pop() {
        blob.push((x, y));
        if blob.len() > config.max_pixels {
            return;
        }
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= plane.height {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                let idx = ny * w + nx;
                if visited[idx] {
                    continue;
                }
                visited[idx] = true;
                if plane.at(nx, ny) > local_threshold {
                    stack.push((nx, ny));
                }
            }
        }
    }
}

/// Apply the size and corner checks, and compute the weighted centroid.
fn evaluate_blob(
    plane: &Plane,
    blob: &[(usize, usize)],
    config: &BlobDetectionConfig,
) -> Option<Centroid> {
    if blob.len() < config.min_pixels || blob.len() > config.max_pixels {
        return None;
    }

    let mut sum = 0.0;
    let mut sum_u = 0.0;
    let mut sum_v = 0.0;
    let (mut min_x, mut max_x) = (usize::MAX, 0);
    let (mut min_y, mut max_y) = (usize::MAX, 0);
    for &(x, y) in blob {
        let val = plane.at(x, y);
        sum += val;
        sum_u += val * x as f64;
        sum_v += val * y as f64;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if !(sum > 0.0) {
        return None;
    }

    // Corners of the expanded box; corners off the image read as 0
    let mean = sum / blob.len() as f64;
    let m = config.corner_margin as isize;
    let x0 = min_x as isize - m;
    let y0 = min_y as isize - m;
    let x1 = max_x as isize + m;
    let y1 = max_y as isize + m;
    let dark_corners = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
        .iter()
        .all(|&(cx, cy)| plane.at_signed(cx, cy) < mean - config.corner_delta);
    if !dark_corners {
        return None;
    }

    Some(Centroid {
        u: sum_u / sum,
        v: sum_v / sum,
        mass: Some(sum),
    })
}
