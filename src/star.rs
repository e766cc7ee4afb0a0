use rkyv::{Archive, Deserialize, Serialize};

use crate::Vector3;

/// A catalog star used for matching.
///
/// The direction is a unit vector in the reference (celestial) frame. The
/// magnitude is only used to thin the catalog when generating the pair table;
/// its exact meaning is catalog-dependent.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct CatalogStar {
    pub id: u64,
    pub uvec: [f64; 3],
    pub mag: Option<f32>,
}

impl CatalogStar {
    /// Create a star from an arbitrary (non-zero) direction. The direction is normalized.
    ///
    /// Returns `None` for zero-length or non-finite directions.
    pub fn new(id: u64, dir: Vector3) -> Option<Self> {
        let norm = dir.norm();
        if !norm.is_finite() || norm <= 0.0 {
            return None;
        }
        let u = dir / norm;
        Some(Self {
            id,
            uvec: [u.x, u.y, u.z],
            mag: None,
        })
    }

    /// Create a star from right ascension and declination (radians).
    pub fn from_radec(id: u64, ra_rad: f64, dec_rad: f64) -> Self {
        let (rasin, racos) = ra_rad.sin_cos();
        let (decsin, deccos) = dec_rad.sin_cos();
        Self {
            id,
            uvec: [deccos * racos, deccos * rasin, decsin],
            mag: None,
        }
    }

    pub fn with_mag(mut self, mag: f32) -> Self {
        self.mag = Some(mag);
        self
    }

    /// Unit vector pointing to the star's position on the celestial sphere.
    pub fn uvec(&self) -> Vector3 {
        Vector3::new(self.uvec[0], self.uvec[1], self.uvec[2])
    }
}

/// Precomputed angular separation between two catalog stars.
///
/// Pairs are stored once with `star_a < star_b`; consumers that need both
/// orderings insert them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct StarAnglePair {
    pub star_a: u64,
    pub star_b: u64,
    /// Angular separation in radians.
    pub angle: f64,
}

/// Angle between two unit vectors, with the dot product clamped into `[-1, 1]`
/// so rounding on nearly-identical vectors cannot produce NaN.
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_direction() {
        let s = CatalogStar::new(7, Vector3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((s.uvec().norm() - 1.0).abs() < 1e-15);
        assert!((s.uvec[1] - 0.6).abs() < 1e-15);
        assert!(CatalogStar::new(8, Vector3::zeros()).is_none());
    }

    #[test]
    fn radec_matches_axes() {
        let s = CatalogStar::from_radec(1, 0.0, std::f64::consts::FRAC_PI_2);
        assert!((s.uvec[2] - 1.0).abs() < 1e-12);
        let s = CatalogStar::from_radec(2, std::f64::consts::FRAC_PI_2, 0.0);
        assert!((s.uvec[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn angle_between_is_clamped() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(1.0 + 1e-16, 0.0, 0.0);
        assert_eq!(angle_between(&a, &b), 0.0);
        let c = Vector3::new(0.0, 1.0, 0.0);
        assert!((angle_between(&a, &c) - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
    }
}
