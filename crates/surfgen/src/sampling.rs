//! Surface sampling of triangle meshes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use cloud_io::PointCloud;
use hashbrown::HashMap;
use log::debug;
use nalgebra::{Point3, Vector3};
use rand::Rng;

use crate::mesh::TriMesh;
use crate::{SynthError, SynthResult};

/// Candidates drawn per requested point before elimination.
pub const INIT_FACTOR: usize = 5;

/// Exponent of the elimination weight falloff.
const WEIGHT_ALPHA: i32 = 8;

fn check_mesh(mesh: &TriMesh, point_count: usize) -> SynthResult<f64> {
    if point_count == 0 {
        return Err(SynthError::invalid("point_count must be > 0"));
    }
    if mesh.is_empty() {
        return Err(SynthError::invalid("cannot sample an empty mesh"));
    }
    let area = mesh.surface_area();
    if !(area.is_finite() && area > 0.0) {
        return Err(SynthError::invalid(format!("mesh surface area is {area}")));
    }
    Ok(area)
}

/// `point_count` points uniformly distributed over the surface by area.
/// Normals are interpolated when the mesh carries vertex normals.
pub fn sample_uniform<R: Rng + ?Sized>(
    mesh: &TriMesh,
    point_count: usize,
    rng: &mut R,
) -> SynthResult<PointCloud> {
    check_mesh(mesh, point_count)?;

    let mut cumulative = Vec::with_capacity(mesh.faces.len());
    let mut total = 0.0;
    for f in 0..mesh.faces.len() {
        total += mesh.triangle_area(f);
        cumulative.push(total);
    }

    let mut positions = Vec::with_capacity(point_count);
    let mut normals = mesh.normals.as_ref().map(|_| Vec::with_capacity(point_count));

    for _ in 0..point_count {
        let target = rng.gen_range(0.0..total);
        let f = cumulative
            .partition_point(|&c| c <= target)
            .min(mesh.faces.len() - 1);
        let [i0, i1, i2] = mesh.faces[f].map(|i| i as usize);

        let r1: f64 = rng.gen::<f64>().sqrt();
        let r2: f64 = rng.gen();
        let (a, b, c) = (1.0 - r1, r1 * (1.0 - r2), r1 * r2);

        let p: Point3<f64> = Point3::from(
            mesh.vertices[i0].coords * a + mesh.vertices[i1].coords * b + mesh.vertices[i2].coords * c,
        );
        positions.push([p.x, p.y, p.z]);

        if let (Some(out), Some(vn)) = (&mut normals, &mesh.normals) {
            let n: Vector3<f64> = vn[i0] * a + vn[i1] * b + vn[i2] * c;
            let n = n.try_normalize(0.0).unwrap_or(n);
            out.push([n.x, n.y, n.z]);
        }
    }

    let cloud = PointCloud::from_positions(positions);
    Ok(match normals {
        Some(normals) => cloud.with_normals(normals)?,
        None => cloud,
    })
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    weight: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.index.cmp(&self.index))
    }
}

type Cell = (i64, i64, i64);

fn cell_of(p: &[f64; 3], size: f64) -> Cell {
    (
        (p[0] / size).floor() as i64,
        (p[1] / size).floor() as i64,
        (p[2] / size).floor() as i64,
    )
}

/// For every point, the other points within `radius` and their distances.
fn neighborhoods(points: &[[f64; 3]], radius: f64) -> Vec<Vec<(usize, f64)>> {
    let mut grid: HashMap<Cell, Vec<usize>> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        grid.entry(cell_of(p, radius)).or_default().push(i);
    }

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (cx, cy, cz) = cell_of(p, radius);
            let mut near = Vec::new();
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                            continue;
                        };
                        for &j in bucket {
                            if j == i {
                                continue;
                            }
                            let q = &points[j];
                            let d = ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2))
                                .sqrt();
                            if d < radius {
                                near.push((j, d));
                            }
                        }
                    }
                }
            }
            near
        })
        .collect()
}

/// Blue-noise surface samples by weighted sample elimination.
///
/// Draws `INIT_FACTOR * point_count` uniform candidates, then repeatedly
/// removes the candidate with the largest crowding weight
/// `Σ (1 - d / 2r)^8` over neighbors closer than `2r`, where
/// `r = sqrt(A / (2√3 N))` is the packing radius for `N` points on area `A`.
/// Surviving samples keep their candidate order.
pub fn sample_poisson_disk<R: Rng + ?Sized>(
    mesh: &TriMesh,
    point_count: usize,
    rng: &mut R,
) -> SynthResult<PointCloud> {
    let area = check_mesh(mesh, point_count)?;
    let candidates = sample_uniform(mesh, point_count * INIT_FACTOR, rng)?;

    let r_max = (area / (2.0 * 3f64.sqrt() * point_count as f64)).sqrt();
    let reach = 2.0 * r_max;
    let weight_of = |d: f64| (1.0 - d / reach).powi(WEIGHT_ALPHA);

    let near = neighborhoods(&candidates.positions, reach);
    let mut weights: Vec<f64> = near
        .iter()
        .map(|n| n.iter().map(|&(_, d)| weight_of(d)).sum())
        .collect();
    let mut alive = vec![true; candidates.len()];
    let mut remaining = candidates.len();

    let mut heap: BinaryHeap<Candidate> = weights
        .iter()
        .enumerate()
        .map(|(index, &weight)| Candidate { weight, index })
        .collect();

    while remaining > point_count {
        let Some(top) = heap.pop() else { break };
        // Stale entries: already removed, or superseded by a lower weight.
        if !alive[top.index] || top.weight.to_bits() != weights[top.index].to_bits() {
            continue;
        }

        alive[top.index] = false;
        remaining -= 1;
        for &(j, d) in &near[top.index] {
            if alive[j] {
                weights[j] -= weight_of(d);
                heap.push(Candidate {
                    weight: weights[j],
                    index: j,
                });
            }
        }
    }

    let keep: Vec<usize> = (0..candidates.len()).filter(|&i| alive[i]).collect();
    debug!(
        "poisson disk: {} candidates -> {} samples (r = {r_max:.5})",
        candidates.len(),
        keep.len()
    );
    Ok(candidates.select_by_index(&keep))
}
