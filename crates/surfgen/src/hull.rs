//! 3D convex hull (quickhull), reporting only which input points are hull
//! vertices.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone)]
struct Face {
    /// Counter-clockwise seen from outside.
    v: [usize; 3],
    normal: Vector3<f64>,
    offset: f64,
    outside: Vec<usize>,
    alive: bool,
}

impl Face {
    fn new(v: [usize; 3], points: &[Point3<f64>]) -> Self {
        let [a, b, c] = v.map(|i| points[i]);
        let n = (b - a).cross(&(c - a));
        let normal = n.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        Self {
            v,
            offset: normal.dot(&a.coords),
            normal,
            outside: Vec::new(),
            alive: true,
        }
    }

    #[inline]
    fn distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

struct Hull<'a> {
    points: &'a [Point3<f64>],
    eps: f64,
    faces: Vec<Face>,
    /// Directed edge -> owning face.
    edges: HashMap<(usize, usize), usize>,
}

impl<'a> Hull<'a> {
    fn add_face(&mut self, v: [usize; 3]) -> usize {
        let id = self.faces.len();
        let face = Face::new(v, self.points);
        for e in face.edges() {
            self.edges.insert(e, id);
        }
        self.faces.push(face);
        id
    }

    fn remove_face(&mut self, id: usize) -> Vec<usize> {
        let face = &mut self.faces[id];
        face.alive = false;
        let orphans = std::mem::take(&mut face.outside);
        for e in face.edges() {
            if self.edges.get(&e) == Some(&id) {
                self.edges.remove(&e);
            }
        }
        orphans
    }

    /// Hand each candidate to the face in `faces` it lies farthest outside of.
    /// Candidates outside none of them are interior and dropped.
    fn assign(&mut self, candidates: impl IntoIterator<Item = usize>, faces: &[usize]) {
        for p in candidates {
            let point = self.points[p];
            let best = faces
                .iter()
                .map(|&f| (f, self.faces[f].distance(&point)))
                .filter(|&(_, d)| d > self.eps)
                .max_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((f, _)) = best {
                self.faces[f].outside.push(p);
            }
        }
    }

    fn expand(&mut self, start: usize) {
        let face = &self.faces[start];
        let Some(&eye) = face
            .outside
            .iter()
            .max_by(|&&a, &&b| face.distance(&self.points[a]).total_cmp(&face.distance(&self.points[b])))
        else {
            return;
        };
        let eye_point = self.points[eye];

        let mut visible = HashSet::new();
        let mut stack = vec![start];
        visible.insert(start);
        let mut horizon = Vec::new();

        while let Some(f) = stack.pop() {
            for (a, b) in self.faces[f].edges() {
                match self.edges.get(&(b, a)).copied() {
                    Some(n) if visible.contains(&n) => {}
                    Some(n) if self.faces[n].distance(&eye_point) > self.eps => {
                        visible.insert(n);
                        stack.push(n);
                    }
                    _ => horizon.push((a, b)),
                }
            }
        }

        let mut orphans = Vec::new();
        for &f in &visible {
            orphans.extend(self.remove_face(f));
        }
        orphans.retain(|&p| p != eye);

        let created: Vec<usize> = horizon
            .iter()
            .map(|&(a, b)| self.add_face([a, b, eye]))
            .collect();
        self.assign(orphans, &created);
    }
}

/// Indices of the points that are vertices of the convex hull, sorted.
///
/// Returns `None` when fewer than four affinely independent points exist.
pub fn hull_vertices(points: &[Point3<f64>]) -> Option<Vec<usize>> {
    if points.len() < 4 {
        return None;
    }

    let mut max_abs = [0.0f64; 3];
    for p in points {
        for k in 0..3 {
            max_abs[k] = max_abs[k].max(p[k].abs());
        }
    }
    let eps = 3.0 * f64::EPSILON * (max_abs[0] + max_abs[1] + max_abs[2]);

    let simplex = initial_simplex(points, eps)?;
    let mut hull = Hull {
        points,
        eps,
        faces: Vec::new(),
        edges: HashMap::new(),
    };

    let centroid = Point3::from(simplex.iter().fold(Vector3::zeros(), |acc, &i| acc + points[i].coords) / 4.0);
    let [s0, s1, s2, s3] = simplex;
    for mut tri in [[s0, s1, s2], [s0, s1, s3], [s0, s2, s3], [s1, s2, s3]] {
        if Face::new(tri, points).distance(&centroid) > 0.0 {
            tri.swap(1, 2);
        }
        hull.add_face(tri);
    }

    let first: Vec<usize> = (0..4).collect();
    hull.assign((0..points.len()).filter(|i| !simplex.contains(i)), &first);

    let mut pending: Vec<usize> = first;
    while let Some(f) = pending.pop() {
        if !hull.faces[f].alive || hull.faces[f].outside.is_empty() {
            continue;
        }
        let before = hull.faces.len();
        hull.expand(f);
        pending.extend(before..hull.faces.len());
    }

    let mut vertices: Vec<usize> = hull
        .faces
        .iter()
        .filter(|f| f.alive)
        .flat_map(|f| f.v)
        .collect();
    vertices.sort_unstable();
    vertices.dedup();
    Some(vertices)
}

fn initial_simplex(points: &[Point3<f64>], eps: f64) -> Option<[usize; 4]> {
    let mut extremes = [0usize; 6];
    for (i, p) in points.iter().enumerate() {
        for k in 0..3 {
            if p[k] < points[extremes[2 * k]][k] {
                extremes[2 * k] = i;
            }
            if p[k] > points[extremes[2 * k + 1]][k] {
                extremes[2 * k + 1] = i;
            }
        }
    }

    let (mut a, mut b, mut best) = (0, 0, -1.0);
    for &i in &extremes {
        for &j in &extremes {
            let d = (points[i] - points[j]).norm_squared();
            if d > best {
                (a, b, best) = (i, j, d);
            }
        }
    }
    if best.sqrt() <= eps {
        return None;
    }

    let dir = points[b] - points[a];
    let (c, line_dist) = farthest(points, |p| dir.cross(&(p - points[a])).norm() / dir.norm())?;
    if line_dist <= eps {
        return None;
    }

    let normal = dir.cross(&(points[c] - points[a])).normalize();
    let (d, plane_dist) = farthest(points, |p| normal.dot(&(p - points[a])).abs())?;
    if plane_dist <= eps {
        return None;
    }

    Some([a, b, c, d])
}

fn farthest(points: &[Point3<f64>], metric: impl Fn(&Point3<f64>) -> f64) -> Option<(usize, f64)> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, metric(p)))
        .max_by(|x, y| x.1.total_cmp(&y.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn cube_corners_with_interior_points() {
        let mut points = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    points.push(Point3::new(x, y, z));
                }
            }
        }
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            points.push(Point3::new(
                rng.gen_range(0.05..0.95),
                rng.gen_range(0.05..0.95),
                rng.gen_range(0.05..0.95),
            ));
        }

        assert_eq!(hull_vertices(&points), Some((0..8).collect()));
    }

    #[test]
    fn points_on_sphere_are_all_vertices() {
        let mut rng = StdRng::seed_from_u64(12);
        let points: Vec<Point3<f64>> = (0..300)
            .map(|_| {
                let v = Vector3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                Point3::from(v.normalize())
            })
            .collect();

        let hull = hull_vertices(&points).unwrap();
        assert_eq!(hull.len(), points.len());
    }

    #[test]
    fn random_cloud_hull_is_strict_subset() {
        let mut rng = StdRng::seed_from_u64(21);
        let points: Vec<Point3<f64>> = (0..500)
            .map(|_| Point3::new(rng.gen(), rng.gen(), rng.gen()))
            .collect();

        let eps = 3.0 * f64::EPSILON * 3.0;
        let simplex = initial_simplex(&points, eps).unwrap();
        assert_eq!(simplex.iter().collect::<HashSet<_>>().len(), 4);

        let vertices = hull_vertices(&points).unwrap();
        assert!(vertices.len() >= 4 && vertices.len() < points.len());
        assert!(vertices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn coplanar_input_is_degenerate() {
        let points: Vec<Point3<f64>> = (0..50)
            .map(|i| Point3::new((i % 7) as f64, (i / 7) as f64, 0.0))
            .collect();
        assert_eq!(hull_vertices(&points), None);
        assert_eq!(hull_vertices(&points[..3]), None);
    }
}
