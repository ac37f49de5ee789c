//! Embedded workpiece shapes raised into a height field.
//!
//! Each primitive is an explicit per-cell rule: a membership predicate plus a
//! target height, combined with the running field by elementwise maximum.
//! Overlays therefore never lower a cell.
//!
//! Two behaviors are kept as-is because existing datasets depend on them:
//! - Cuboid raises the union of an X band and a Y band (a cross of two
//!   infinite strips), not the rectangle where they intersect.
//! - Cone raises a thin ring at its base perimeter to the full height,
//!   producing a rim rather than a sharper apex.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::heightfield::HeightField;

/// Half-thickness of the rim ring around cylinders and cones.
pub const RIM_TOLERANCE: f64 = 0.1;

/// Number of intermediate levels visited by the side-wall fill.
pub const WALL_LEVELS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Cuboid {
        center: [f64; 2],
        size: [f64; 2],
        height: f64,
    },
    Cylinder {
        center: [f64; 2],
        radius: f64,
        height: f64,
    },
    Cone {
        center: [f64; 2],
        radius: f64,
        height: f64,
    },
}

impl Primitive {
    /// Uniform variant choice, center anywhere in the `width × height` domain.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, width: f64, height: f64) -> Self {
        let variant = rng.gen_range(0..3);
        let center = [
            rng.gen_range(-width / 2.0..width / 2.0),
            rng.gen_range(-height / 2.0..height / 2.0),
        ];

        match variant {
            0 => Primitive::Cuboid {
                center,
                size: [rng.gen_range(1.0..3.0), rng.gen_range(1.0..3.0)],
                height: rng.gen_range(1.0..3.0),
            },
            1 => Primitive::Cylinder {
                center,
                radius: rng.gen_range(1.0..2.0),
                height: rng.gen_range(1.0..3.0),
            },
            _ => Primitive::Cone {
                center,
                radius: rng.gen_range(1.0..2.0),
                height: rng.gen_range(1.0..3.0),
            },
        }
    }

    pub fn center(&self) -> [f64; 2] {
        match *self {
            Primitive::Cuboid { center, .. }
            | Primitive::Cylinder { center, .. }
            | Primitive::Cone { center, .. } => center,
        }
    }

    /// New height of a cell at `(x, y)` currently at `z`. Never below `z`.
    pub fn raised_height(&self, x: f64, y: f64, z: f64, elevation: f64) -> f64 {
        match *self {
            Primitive::Cuboid {
                center,
                size,
                height,
            } => {
                let in_x = (x - center[0]).abs() <= size[0] / 2.0;
                let in_y = (y - center[1]).abs() <= size[1] / 2.0;
                if in_x || in_y {
                    z.max(elevation + height)
                } else {
                    z
                }
            }
            Primitive::Cylinder {
                center,
                radius,
                height,
            } => {
                let dist = (x - center[0]).hypot(y - center[1]);
                let mut out = z;
                if dist < radius {
                    out = out.max(elevation + height);
                }
                if (dist - radius).abs() < RIM_TOLERANCE {
                    out = out.max(elevation + height);
                }
                fill_side_wall(out, dist, radius, height, elevation)
            }
            Primitive::Cone {
                center,
                radius,
                height,
            } => {
                let dist = (x - center[0]).hypot(y - center[1]);
                let mut out = z;
                if dist < radius {
                    out = out.max(elevation + height * (1.0 - dist / radius));
                }
                if (dist - radius).abs() < RIM_TOLERANCE {
                    out = out.max(elevation + height);
                }
                fill_side_wall(out, dist, radius, height, elevation)
            }
        }
    }

    pub fn overlay(&self, field: &mut HeightField, elevation: f64) {
        let (rows, cols) = field.shape();
        for i in 0..rows {
            for j in 0..cols {
                let z = field.z[(i, j)];
                field.z[(i, j)] = self.raised_height(field.x[(i, j)], field.y[(i, j)], z, elevation);
            }
        }
    }
}

/// Snap cells inside the footprint that sit within the rim tolerance of one of
/// the evenly spaced levels `elevation + d`, d in [0, height], up to that level.
/// For cylinders the plateau already exceeds every level, so this changes nothing.
fn fill_side_wall(z: f64, dist: f64, radius: f64, height: f64, elevation: f64) -> f64 {
    if dist >= radius {
        return z;
    }

    (0..WALL_LEVELS).fold(z, |acc, k| {
        let level = elevation + height * k as f64 / (WALL_LEVELS - 1) as f64;
        if (acc - level).abs() < RIM_TOLERANCE {
            acc.max(level)
        } else {
            acc
        }
    })
}
