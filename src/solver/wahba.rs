//! Least-squares rotation between matched vector sets (Wahba's problem).

use crate::{Matrix3, Rotation, Vector3};

use super::Correspondence;

/// Solve for the rotation `R` minimizing `Σ |observed_i - R · catalog_i|²`.
///
/// Uses SVD of the attitude profile matrix `B = Σ(observed_i ⊗ catalog_i)`.
/// With `B = U Σ Vᵀ` the result is `R = U · diag(1, 1, det U · det V) · Vᵀ`,
/// which is a proper rotation even when `U` or `V` is a reflection.
/// The resulting R satisfies: `camera_vec ≈ R * reference_vec`.
///
/// Returns `None` for fewer than two correspondences, or when the
/// decomposition does not produce finite values.
pub fn solve_wahba(correspondences: &[Correspondence]) -> Option<Rotation> {
    if correspondences.len() < 2 {
        return None;
    }

    let b = correspondences
        .iter()
        .fold(Matrix3::zeros(), |acc, c| acc + c.observed * c.catalog.transpose());

    let svd = b.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let d = if u.determinant() * v_t.determinant() < 0.0 {
        -1.0
    } else {
        1.0
    };
    let r = u * Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d)) * v_t;

    r.iter()
        .all(|x| x.is_finite())
        .then(|| Rotation::from_matrix_unchecked(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn random_unit(rng: &mut StdRng) -> Vector3 {
        let z: f64 = rng.random::<f64>() * 2.0 - 1.0;
        let phi: f64 = rng.random::<f64>() * std::f64::consts::TAU;
        let r = (1.0 - z * z).sqrt();
        Vector3::new(r * phi.cos(), r * phi.sin(), z)
    }

    fn correspondences(rotation: &Rotation, catalog: &[Vector3]) -> Vec<Correspondence> {
        catalog
            .iter()
            .enumerate()
            .map(|(i, c)| Correspondence {
                observed: rotation * c,
                catalog: *c,
                catalog_id: i as u64,
            })
            .collect()
    }

    #[test]
    fn test_recovers_known_rotation() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let truth = Rotation::from_euler_angles(
                rng.random_range(-3.0..3.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(-3.0..3.0),
            );
            let n = rng.random_range(3..12);
            let catalog: Vec<Vector3> = (0..n).map(|_| random_unit(&mut rng)).collect();

            let r = solve_wahba(&correspondences(&truth, &catalog)).unwrap();
            assert!(
                (r.matrix() - truth.matrix()).abs().max() < 1e-9,
                "recovered {r} expected {truth}"
            );
        }
    }

    #[test]
    fn test_two_vectors_suffice() {
        let truth = Rotation::from_axis_angle(&Vector3::y_axis(), 0.7);
        let catalog = [Vector3::x(), Vector3::new(0.0, 0.6, 0.8)];
        let r = solve_wahba(&correspondences(&truth, &catalog)).unwrap();
        assert!((r.matrix() - truth.matrix()).abs().max() < 1e-12);
    }

    #[test]
    fn test_result_is_proper_rotation() {
        // Mirrored observations make U·Vᵀ a reflection; the correction must undo that.
        let mut rng = StdRng::seed_from_u64(8);
        let flip = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        let pairs: Vec<Correspondence> = (0..6)
            .map(|i| {
                let c = random_unit(&mut rng);
                Correspondence {
                    observed: flip * c,
                    catalog: c,
                    catalog_id: i,
                }
            })
            .collect();

        let r = solve_wahba(&pairs).unwrap();
        let m = r.matrix();
        assert!((m.determinant() - 1.0).abs() < 1e-12);
        assert!((m * m.transpose() - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_noisy_observations() {
        let mut rng = StdRng::seed_from_u64(21);
        let noise = Normal::new(0.0, 1e-4).unwrap();
        let truth = Rotation::from_euler_angles(0.2, 0.4, -0.9);
        let pairs: Vec<Correspondence> = (0..30)
            .map(|i| {
                let c = random_unit(&mut rng);
                let jitter = Vector3::new(
                    noise.sample(&mut rng),
                    noise.sample(&mut rng),
                    noise.sample(&mut rng),
                );
                Correspondence {
                    observed: (truth * c + jitter).normalize(),
                    catalog: c,
                    catalog_id: i,
                }
            })
            .collect();

        let r = solve_wahba(&pairs).unwrap();
        assert!(r.angle_to(&truth) < 1e-4);
    }

    #[test]
    fn test_too_few_correspondences() {
        assert!(solve_wahba(&[]).is_none());
        let one = Correspondence {
            observed: Vector3::x(),
            catalog: Vector3::y(),
            catalog_id: 1,
        };
        assert!(solve_wahba(&[one]).is_none());
    }
}
