//! Noisy / ground-truth cloud pairs derived from one height field.

use cloud_io::PointCloud;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::heightfield::HeightField;
use crate::{SynthError, SynthResult};

pub const MIN_OUTLIERS: usize = 5;
pub const MAX_OUTLIERS: usize = 15;
/// Outliers are perturbed by a value drawn from `[-OUTLIER_SPAN, OUTLIER_SPAN]`.
pub const OUTLIER_SPAN: f64 = 3.0;

/// Perturbed copy of the field, flattened row-major.
///
/// Adds a periodic ripple `bumpiness·sin(2πX/ncols)·cos(2πY/nrows)`, per-cell
/// Gaussian noise with standard deviation `bumpiness`, and 5–15 single-cell
/// outliers. X and Y are untouched, so the result pairs point-for-point with
/// [`to_smooth`].
pub fn to_noisy<R: Rng + ?Sized>(
    field: &HeightField,
    bumpiness: f64,
    rng: &mut R,
) -> SynthResult<PointCloud> {
    if !(bumpiness.is_finite() && bumpiness >= 0.0) {
        return Err(SynthError::invalid(format!(
            "bumpiness must be a finite value >= 0, got {bumpiness}"
        )));
    }
    let noise = Normal::new(0.0, bumpiness)
        .map_err(|e| SynthError::invalid(format!("noise distribution: {e}")))?;

    let (rows, cols) = field.shape();
    let mut z = field.z.clone();

    for i in 0..rows {
        for j in 0..cols {
            let x = field.x[(i, j)];
            let y = field.y[(i, j)];
            let ripple = (2.0 * std::f64::consts::PI * x / cols as f64).sin()
                * (2.0 * std::f64::consts::PI * y / rows as f64).cos()
                * bumpiness;
            z[(i, j)] += ripple + noise.sample(rng);
        }
    }

    let outliers = rng.gen_range(MIN_OUTLIERS..=MAX_OUTLIERS);
    for _ in 0..outliers {
        let i = rng.gen_range(0..rows);
        let j = rng.gen_range(0..cols);
        z[(i, j)] += rng.gen_range(-OUTLIER_SPAN..=OUTLIER_SPAN);
    }

    Ok(field.flatten_with(&z))
}

/// The unperturbed field, flattened row-major.
pub fn to_smooth(field: &HeightField) -> PointCloud {
    field.flatten_with(&field.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::PlaneParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field(seed: u64) -> HeightField {
        let params = PlaneParams {
            groove_depth: 1.2,
            slope_factor: 0.1,
            elevation: 0.5,
            ..PlaneParams::default()
        };
        HeightField::generate(&params, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn smooth_matches_grid_exactly() {
        let field = field(3);
        let smooth = to_smooth(&field);
        assert_eq!(smooth.len(), 100 * 100);

        for (k, p) in smooth.positions.iter().enumerate() {
            let (i, j) = (k / 100, k % 100);
            assert_eq!(p[0], field.x[(i, j)]);
            assert_eq!(p[1], field.y[(i, j)]);
            assert_eq!(p[2], field.z[(i, j)]);
        }
    }

    #[test]
    fn noisy_pairs_with_smooth() {
        let field = field(4);
        let bumpiness = 0.1;
        let mut rng = StdRng::seed_from_u64(40);
        let noisy = to_noisy(&field, bumpiness, &mut rng).unwrap();
        let smooth = to_smooth(&field);

        assert_eq!(noisy.len(), smooth.len());

        let mut large = 0;
        for (n, s) in noisy.positions.iter().zip(&smooth.positions) {
            assert_eq!(n[0], s[0]);
            assert_eq!(n[1], s[1]);

            let dz = (n[2] - s[2]).abs();
            // ripple ≤ b, Gaussian within 6σ, outliers add at most 3 each
            if dz > 7.0 * bumpiness {
                large += 1;
                assert!(dz <= 7.0 * bumpiness + OUTLIER_SPAN * MAX_OUTLIERS as f64);
            }
        }
        assert!(large <= MAX_OUTLIERS, "{large} points beyond the noise envelope");
    }

    #[test]
    fn zero_bumpiness_leaves_only_outliers() {
        let field = field(5);
        let noisy = to_noisy(&field, 0.0, &mut StdRng::seed_from_u64(1)).unwrap();
        let smooth = to_smooth(&field);

        let changed = noisy
            .positions
            .iter()
            .zip(&smooth.positions)
            .filter(|(n, s)| n[2] != s[2])
            .count();
        assert!(changed <= MAX_OUTLIERS);
    }

    #[test]
    fn negative_bumpiness_is_rejected() {
        let field = field(6);
        assert!(matches!(
            to_noisy(&field, -0.05, &mut StdRng::seed_from_u64(0)),
            Err(SynthError::InvalidParameter { .. })
        ));
    }
}
