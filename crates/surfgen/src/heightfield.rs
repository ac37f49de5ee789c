//! Height-field synthesis: tilted plane, groove channel, Gaussian bumps and
//! embedded primitive overlays on an R×R grid.

use cloud_io::PointCloud;
use log::debug;
use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::primitives::Primitive;
use crate::{SynthError, SynthResult};

/// Inputs of [`HeightField::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneParams {
    /// Physical extent along X.
    pub width: f64,
    /// Physical extent along Y.
    pub height: f64,
    /// Grid side length (samples per axis).
    pub resolution: usize,
    pub groove_depth: f64,
    /// Tilt along X: Z gains `slope_factor * X`.
    pub slope_factor: f64,
    /// Base level of the plane.
    pub elevation: f64,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 10.0,
            resolution: 100,
            groove_depth: 1.0,
            slope_factor: 0.0,
            elevation: 0.0,
        }
    }
}

impl PlaneParams {
    pub fn validate(&self) -> SynthResult<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(SynthError::invalid(format!("width must be > 0, got {}", self.width)));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(SynthError::invalid(format!("height must be > 0, got {}", self.height)));
        }
        if self.resolution < 2 {
            return Err(SynthError::invalid(format!(
                "resolution must be >= 2, got {}",
                self.resolution
            )));
        }
        if !(self.groove_depth.is_finite() && self.groove_depth >= 0.0) {
            return Err(SynthError::invalid(format!(
                "groove_depth must be >= 0, got {}",
                self.groove_depth
            )));
        }
        if !self.slope_factor.is_finite() || !self.elevation.is_finite() {
            return Err(SynthError::invalid("slope_factor and elevation must be finite"));
        }
        Ok(())
    }
}

/// A Gaussian bump: `height * exp(-d² / (2 (radius/2)²))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bump {
    pub center: [f64; 2],
    pub radius: f64,
    pub height: f64,
}

impl Bump {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, width: f64, height: f64) -> Self {
        let center = [
            rng.gen_range(-width / 2.0..width / 2.0),
            rng.gen_range(-height / 2.0..height / 2.0),
        ];
        Self {
            center,
            radius: rng.gen_range(1.0..3.0),
            height: rng.gen_range(1.0..3.0),
        }
    }

    #[inline]
    pub fn profile(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        let sigma = self.radius / 2.0;
        self.height * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
    }
}

/// Features drawn for one field, kept for the dataset manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub groove_width: f64,
    pub bumps: Vec<Bump>,
    pub primitives: Vec<Primitive>,
}

/// X, Y and Z grids of identical R×R shape. Rows follow Y, columns follow X.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    pub x: DMatrix<f64>,
    pub y: DMatrix<f64>,
    pub z: DMatrix<f64>,
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n)
        .map(|i| if i + 1 == n { hi } else { lo + step * i as f64 })
        .collect()
}

impl HeightField {
    /// Tilted plane without features: `Z = elevation + slope_factor * X`.
    pub fn base(params: &PlaneParams) -> SynthResult<Self> {
        params.validate()?;

        let n = params.resolution;
        let xs = linspace(-params.width / 2.0, params.width / 2.0, n);
        let ys = linspace(-params.height / 2.0, params.height / 2.0, n);

        let x = DMatrix::from_fn(n, n, |_, j| xs[j]);
        let y = DMatrix::from_fn(n, n, |i, _| ys[i]);
        let z = x.map(|xv| params.elevation + params.slope_factor * xv);

        Ok(Self { x, y, z })
    }

    pub fn generate<R: Rng + ?Sized>(params: &PlaneParams, rng: &mut R) -> SynthResult<Self> {
        Self::generate_detailed(params, rng).map(|(field, _)| field)
    }

    /// Like [`generate`](Self::generate), also returning the drawn features.
    pub fn generate_detailed<R: Rng + ?Sized>(
        params: &PlaneParams,
        rng: &mut R,
    ) -> SynthResult<(Self, Features)> {
        let mut field = Self::base(params)?;

        let groove_width = params.width / rng.gen_range(8.0..12.0);
        field.apply_groove(groove_width, params.groove_depth);

        let bump_count = rng.gen_range(2..=4);
        let bumps: Vec<Bump> = (0..bump_count)
            .map(|_| Bump::random(rng, params.width, params.height))
            .collect();
        for bump in &bumps {
            field.add_bump(bump);
        }

        let primitive_count = rng.gen_range(1..=3);
        let primitives: Vec<Primitive> = (0..primitive_count)
            .map(|_| Primitive::random(rng, params.width, params.height))
            .collect();
        for primitive in &primitives {
            primitive.overlay(&mut field, params.elevation);
        }

        debug!(
            "height field {}x{}: groove {:.3} wide, {} bumps, {} primitives",
            params.resolution,
            params.resolution,
            groove_width,
            bumps.len(),
            primitives.len()
        );

        Ok((
            field,
            Features {
                groove_width,
                bumps,
                primitives,
            },
        ))
    }

    /// Lower every cell with `|X| < groove_width / 2` by `depth`.
    pub fn apply_groove(&mut self, groove_width: f64, depth: f64) {
        let half = groove_width / 2.0;
        self.z.zip_apply(&self.x, |z, x| {
            if x.abs() < half {
                *z -= depth;
            }
        });
    }

    pub fn add_bump(&mut self, bump: &Bump) {
        let (rows, cols) = self.shape();
        for i in 0..rows {
            for j in 0..cols {
                self.z[(i, j)] += bump.profile(self.x[(i, j)], self.y[(i, j)]);
            }
        }
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.z.shape()
    }

    /// Row-major flattening of (X, Y, `z`), where `z` has the field's shape.
    pub(crate) fn flatten_with(&self, z: &DMatrix<f64>) -> PointCloud {
        let (rows, cols) = self.shape();
        debug_assert_eq!(z.shape(), (rows, cols));

        let mut positions = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                positions.push([self.x[(i, j)], self.y[(i, j)], z[(i, j)]]);
            }
        }
        PointCloud::from_positions(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scenario() -> PlaneParams {
        PlaneParams {
            width: 10.0,
            height: 10.0,
            resolution: 100,
            groove_depth: 1.0,
            slope_factor: 0.0,
            elevation: 0.0,
        }
    }

    #[test]
    fn grids_share_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        for resolution in [2, 3, 17, 64] {
            let params = PlaneParams {
                resolution,
                ..PlaneParams::default()
            };
            let field = HeightField::generate(&params, &mut rng).unwrap();
            assert_eq!(field.x.shape(), (resolution, resolution));
            assert_eq!(field.y.shape(), (resolution, resolution));
            assert_eq!(field.z.shape(), (resolution, resolution));
        }
    }

    #[test]
    fn grid_spans_domain() {
        let field = HeightField::base(&scenario()).unwrap();
        assert_eq!(field.x[(0, 0)], -5.0);
        assert_eq!(field.x[(0, 99)], 5.0);
        assert_eq!(field.y[(0, 0)], -5.0);
        assert_eq!(field.y[(99, 0)], 5.0);
        // X varies along columns only, Y along rows only.
        assert_eq!(field.x[(42, 7)], field.x[(0, 7)]);
        assert_eq!(field.y[(42, 7)], field.y[(42, 0)]);
    }

    #[test]
    fn invalid_dimensions_fail() {
        let mut rng = StdRng::seed_from_u64(0);
        for params in [
            PlaneParams { resolution: 1, ..scenario() },
            PlaneParams { width: 0.0, ..scenario() },
            PlaneParams { height: -2.0, ..scenario() },
            PlaneParams { groove_depth: -0.1, ..scenario() },
        ] {
            assert!(matches!(
                HeightField::generate(&params, &mut rng),
                Err(SynthError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn groove_cells_drop_by_depth() {
        let params = PlaneParams {
            groove_depth: 0.7,
            slope_factor: 0.15,
            elevation: -0.4,
            ..scenario()
        };
        let mut field = HeightField::base(&params).unwrap();
        let groove_width = params.width / 10.0;
        field.apply_groove(groove_width, params.groove_depth);

        let (rows, cols) = field.shape();
        for i in 0..rows {
            for j in 0..cols {
                let x = field.x[(i, j)];
                let expected = if x.abs() < groove_width / 2.0 {
                    params.elevation + params.slope_factor * x - params.groove_depth
                } else {
                    params.elevation + params.slope_factor * x
                };
                assert_relative_eq!(field.z[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn scenario_center_sits_in_groove() {
        let mut field = HeightField::base(&scenario()).unwrap();
        field.apply_groove(10.0 / 10.0, 1.0);

        // Columns 49 and 50 straddle X = 0 at ±0.0505.
        for j in [49, 50] {
            for i in 0..100 {
                assert_relative_eq!(field.z[(i, j)], -1.0, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(field.z[(50, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bump_peaks_at_center_and_decays() {
        let bump = Bump {
            center: [1.0, -1.0],
            radius: 2.0,
            height: 2.5,
        };
        assert_relative_eq!(bump.profile(1.0, -1.0), 2.5);
        assert!(bump.profile(1.0 + 3.0, -1.0) < 2.5 * 0.02);
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let params = scenario();
        let a = HeightField::generate_detailed(&params, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = HeightField::generate_detailed(&params, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);

        let (_, features) = a;
        assert!((2..=4).contains(&features.bumps.len()));
        assert!((1..=3).contains(&features.primitives.len()));
        assert!(features.groove_width > 10.0 / 12.0 && features.groove_width <= 10.0 / 8.0);
    }
}
