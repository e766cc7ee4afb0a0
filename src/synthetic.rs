//! Synthetic star fields for testing and demos.
//!
//! Catalog stars in front of the camera are drawn as flat squares centered on
//! their projected pixel position, rounded to the nearest pixel.

use image::{Rgb, RgbImage};

use crate::camera_model::CameraModel;
use crate::star::angle_between;
use crate::{Rotation, StarCatalog, Vector3};

/// Rendering parameters.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Half-width of each drawn square; 2 draws 5×5 stars.
    /// Default: 2
    pub star_half_size: u32,
    /// Star pixel value on all three channels.
    /// Default: 255
    pub intensity: u8,
    /// Background pixel value.
    /// Default: 0
    pub background: u8,
    /// Stars whose square would come closer than this to the image edge are skipped.
    /// Default: 10
    pub border_px: u32,
    /// Skip stars closer than this to an already drawn star, in radians.
    /// Default: None
    pub min_separation_rad: Option<f64>,
    /// Stop after this many stars.
    /// Default: None
    pub max_stars: Option<usize>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            star_half_size: 2,
            intensity: 255,
            background: 0,
            border_px: 10,
            min_separation_rad: None,
            max_stars: None,
        }
    }
}

/// A star drawn into a synthetic image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedStar {
    pub id: u64,
    /// Center of the drawn square, in pixels.
    pub u: f64,
    pub v: f64,
}

/// Render the catalog as seen by `camera` at attitude `camera_from_reference`.
///
/// Stars are visited in catalog order. Returns the image and the stars drawn.
pub fn render_star_field(
    catalog: &StarCatalog,
    camera: &CameraModel,
    camera_from_reference: &Rotation,
    width: u32,
    height: u32,
    config: &SyntheticConfig,
) -> (RgbImage, Vec<PlacedStar>) {
    let bg = config.background;
    let mut img = RgbImage::from_pixel(width, height, Rgb([bg, bg, bg]));
    let mut placed = Vec::new();
    let mut placed_dirs: Vec<Vector3> = Vec::new();

    let margin = (config.border_px + config.star_half_size) as f64;
    let limit = config.max_stars.unwrap_or(usize::MAX);
    for star in catalog.stars() {
        if placed.len() >= limit {
            break;
        }
        let dir = star.uvec();
        let Some((u, v)) = camera.project_reference(camera_from_reference, &dir) else {
            continue;
        };
        let (u, v) = (u.round(), v.round());
        if u < margin || v < margin || u >= width as f64 - margin || v >= height as f64 - margin {
            continue;
        }
        if let Some(min_sep) = config.min_separation_rad {
            if placed_dirs.iter().any(|d| angle_between(d, &dir) < min_sep) {
                continue;
            }
        }

        let h = config.star_half_size;
        let (cu, cv) = (u as u32, v as u32);
        let px = Rgb([config.intensity; 3]);
        for y in cv - h..=cv + h {
            for x in cu - h..=cu + h {
                img.put_pixel(x, y, px);
            }
        }
        placed.push(PlacedStar { id: star.id, u, v });
        placed_dirs.push(dir);
    }

    tracing::debug!("Rendered {} synthetic stars", placed.len());
    (img, placed)
}
