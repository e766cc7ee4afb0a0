//! Define a centroid (center of mass) representing
//! a star detection in an unresolved image.
//! Centroids are the output of blob detection and the input to triangle matching.
//!

use crate::camera_model::CameraModel;
use crate::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    /// Centroid position in pixels along columns. Origin is the top-left
    /// pixel; +u points right in the image.
    pub u: f64,
    /// Centroid position in pixels along rows. Origin is the top-left
    /// pixel; +v points down in the image.
    pub v: f64,
    /// Optional summed blob intensity (brighter = higher).
    pub mass: Option<f64>,
}

impl Centroid {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v, mass: None }
    }

    /// Unit vector in the camera frame pointing at this detection.
    pub fn ray(&self, camera: &CameraModel) -> Vector3 {
        camera.pixel_to_ray(self.u, self.v)
    }

    /// Squared pixel distance to `(u, v)`.
    pub fn distance_squared(&self, u: f64, v: f64) -> f64 {
        let du = self.u - u;
        let dv = self.v - v;
        du * du + dv * dv
    }
}
