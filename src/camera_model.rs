//! Pinhole camera intrinsics: focal length and principal point.
//!
//! `CameraModel` maps between pixel coordinates and unit direction vectors in
//! the camera frame. No lens distortion is modelled.
//!
//! # Coordinate conventions
//!
//! - **Pixel coordinates** `(u, v)`: origin at the top-left pixel, +u right
//!   (columns), +v down (rows). Same convention as [`Centroid`](crate::Centroid).
//! - **Camera frame**: +X right, +Y down, +Z along the boresight.
//!
//! # Pipeline
//!
//! ```text
//! pixel → K⁻¹ · [u, v, 1] → normalize → camera-frame unit vector
//! camera-frame vector → K · v → divide by z → pixel
//! ```

use crate::{Matrix3, Rotation, Vector3};

/// Camera intrinsics model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    /// Focal length in pixels.
    pub focal_length_px: f64,
    /// Principal point `[cx, cy]` in pixels. By convention the image center.
    pub principal_point: [f64; 2],
}

impl CameraModel {
    pub fn new(focal_length_px: f64, principal_point: [f64; 2]) -> Self {
        Self {
            focal_length_px,
            principal_point,
        }
    }

    /// Camera model with the principal point at the center of a `width × height` image.
    pub fn from_image_size(focal_length_px: f64, width: u32, height: u32) -> Self {
        Self::new(focal_length_px, [width as f64 / 2.0, height as f64 / 2.0])
    }

    /// Create a camera model from a horizontal field of view and image size.
    pub fn from_fov(fov_rad: f64, width: u32, height: u32) -> Self {
        let f = (width as f64 / 2.0) / (fov_rad / 2.0).tan();
        Self::from_image_size(f, width, height)
    }

    /// Horizontal field of view in radians for a given image width.
    pub fn fov_rad(&self, image_width: u32) -> f64 {
        2.0 * ((image_width as f64 / 2.0) / self.focal_length_px).atan()
    }

    /// Intrinsics matrix `K`.
    pub fn intrinsics(&self) -> Matrix3 {
        let f = self.focal_length_px;
        let [cx, cy] = self.principal_point;
        Matrix3::new(f, 0.0, cx, 0.0, f, cy, 0.0, 0.0, 1.0)
    }

    /// Closed-form inverse of [`intrinsics`](Self::intrinsics).
    pub fn intrinsics_inv(&self) -> Matrix3 {
        let inv_f = 1.0 / self.focal_length_px;
        let [cx, cy] = self.principal_point;
        Matrix3::new(
            inv_f,
            0.0,
            -cx * inv_f,
            0.0,
            inv_f,
            -cy * inv_f,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Unit vector in the camera frame through pixel `(u, v)`.
    pub fn pixel_to_ray(&self, u: f64, v: f64) -> Vector3 {
        (self.intrinsics_inv() * Vector3::new(u, v, 1.0)).normalize()
    }

    /// Project a camera-frame direction to pixel coordinates.
    ///
    /// Returns `None` for directions at or behind the image plane (`z <= 0`).
    pub fn project(&self, cam_vec: &Vector3) -> Option<(f64, f64)> {
        if !(cam_vec.z > 0.0) {
            return None;
        }
        let p = self.intrinsics() * (cam_vec / cam_vec.z);
        Some((p.x, p.y))
    }

    /// Rotate a reference-frame direction into the camera frame and project it.
    pub fn project_reference(
        &self,
        camera_from_reference: &Rotation,
        ref_vec: &Vector3,
    ) -> Option<(f64, f64)> {
        self.project(&(camera_from_reference * ref_vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fov_and_recovery() {
        let fov_rad = 60.0_f64.to_radians();
        let cam = CameraModel::from_fov(fov_rad, 1920, 1080);
        assert!((cam.fov_rad(1920) - fov_rad).abs() < 1e-12);
        assert_eq!(cam.principal_point, [960.0, 540.0]);
    }

    #[test]
    fn test_intrinsics_inverse() {
        let cam = CameraModel::new(2863.6, [1512.0, 2016.0]);
        let prod = cam.intrinsics() * cam.intrinsics_inv();
        assert!((prod - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_center_pixel_is_boresight() {
        let cam = CameraModel::from_image_size(600.0, 960, 540);
        let ray = cam.pixel_to_ray(480.0, 270.0);
        assert!((ray - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-15);
    }

    #[test]
    fn test_roundtrip() {
        let cam = CameraModel::from_image_size(600.0, 960, 540);
        let test_points = [(0.0, 0.0), (100.0, 200.0), (959.0, 539.0), (480.5, 10.25)];

        for &(u, v) in &test_points {
            let ray = cam.pixel_to_ray(u, v);
            assert!((ray.norm() - 1.0).abs() < 1e-12);
            let (u2, v2) = cam.project(&ray).unwrap();
            assert!(
                (u - u2).abs() < 1e-9 && (v - v2).abs() < 1e-9,
                "Roundtrip failed for ({}, {}): got ({}, {})",
                u,
                v,
                u2,
                v2,
            );
        }
    }

    #[test]
    fn test_edge_pixel_angle() {
        // Right edge of a 90° FOV camera is 45° off-axis
        let cam = CameraModel::from_fov(90.0_f64.to_radians(), 1000, 1000);
        let ray = cam.pixel_to_ray(1000.0, 500.0);
        let angle = ray.z.acos();
        assert!((angle - 45.0_f64.to_radians()).abs() < 1e-12);
        assert!(ray.x > 0.0);
    }

    #[test]
    fn test_behind_camera_is_not_projected() {
        let cam = CameraModel::from_image_size(600.0, 960, 540);
        assert!(cam.project(&Vector3::new(0.1, 0.0, -1.0)).is_none());
        assert!(cam.project(&Vector3::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_project_reference_applies_rotation() {
        let cam = CameraModel::from_image_size(600.0, 960, 540);
        // Rotate reference +X onto the boresight
        let rot = Rotation::from_matrix_unchecked(Matrix3::new(
            0.0, -1.0, 0.0, //
            0.0, 0.0, -1.0, //
            1.0, 0.0, 0.0,
        ));
        let (u, v) = cam
            .project_reference(&rot, &Vector3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert!((u - 480.0).abs() < 1e-12 && (v - 270.0).abs() < 1e-12);
    }
}
