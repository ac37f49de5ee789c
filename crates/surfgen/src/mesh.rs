//! Indexed triangle meshes for the scan scene: analytic boxes and cylinders,
//! midpoint subdivision and rigid transforms.

use hashbrown::HashMap;
use nalgebra::{Point3, Rotation3, Vector3};

/// Vertex buffer plus triangle buffer, with optional per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3<f64>>>,
}

impl TriMesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Axis-aligned box spanning `[0,w]×[0,h]×[0,d]`, outward-facing triangles.
    pub fn create_box(width: f64, height: f64, depth: f64) -> Self {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(width, 0.0, 0.0),
            Point3::new(0.0, 0.0, depth),
            Point3::new(width, 0.0, depth),
            Point3::new(0.0, height, 0.0),
            Point3::new(width, height, 0.0),
            Point3::new(0.0, height, depth),
            Point3::new(width, height, depth),
        ];
        let faces = vec![
            [4, 7, 5],
            [4, 6, 7],
            [0, 2, 4],
            [2, 6, 4],
            [0, 1, 2],
            [1, 3, 2],
            [1, 5, 7],
            [1, 7, 3],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 1],
            [1, 4, 5],
        ];
        Self::new(vertices, faces)
    }

    /// Closed cylinder centered on the origin, axis along Z.
    ///
    /// `resolution` segments around the axis, `split` rings along it. Vertex 0
    /// is the top cap center, vertex 1 the bottom cap center.
    pub fn create_cylinder(radius: f64, height: f64, resolution: u32, split: u32) -> Self {
        let res = resolution.max(3);
        let split = split.max(1);
        let step = std::f64::consts::TAU / res as f64;
        let half = height / 2.0;

        let mut vertices = Vec::with_capacity((2 + res * (split + 1)) as usize);
        vertices.push(Point3::new(0.0, 0.0, half));
        vertices.push(Point3::new(0.0, 0.0, -half));
        for i in 0..=split {
            let z = half - height * i as f64 / split as f64;
            for j in 0..res {
                let theta = step * j as f64;
                vertices.push(Point3::new(radius * theta.cos(), radius * theta.sin(), z));
            }
        }

        let mut faces = Vec::with_capacity((2 * res + 2 * res * split) as usize);
        for j in 0..res {
            let j1 = (j + 1) % res;
            faces.push([0, 2 + j, 2 + j1]);
        }
        let bottom = 2 + res * split;
        for j in 0..res {
            let j1 = (j + 1) % res;
            faces.push([1, bottom + j1, bottom + j]);
        }
        for i in 0..split {
            let upper = 2 + res * i;
            let lower = upper + res;
            for j in 0..res {
                let j1 = (j + 1) % res;
                faces.push([lower + j, upper + j1, upper + j]);
                faces.push([lower + j, lower + j1, upper + j1]);
            }
        }

        Self::new(vertices, faces)
    }

    pub fn translate(&mut self, offset: Vector3<f64>) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Rotate vertices about `center`; normals are rotated as well.
    pub fn rotate(&mut self, rotation: &Rotation3<f64>, center: Point3<f64>) {
        for v in &mut self.vertices {
            *v = center + rotation * (*v - center);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals.iter_mut() {
                *n = rotation * *n;
            }
        }
    }

    /// Vertex mean (origin for an empty mesh).
    pub fn center(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    fn corners(&self, face: &[u32; 3]) -> [Point3<f64>; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    /// Unnormalized face normal; its length is twice the triangle area.
    fn face_cross(&self, face: &[u32; 3]) -> Vector3<f64> {
        let [a, b, c] = self.corners(face);
        (b - a).cross(&(c - a))
    }

    pub fn triangle_area(&self, face: usize) -> f64 {
        self.face_cross(&self.faces[face]).norm() * 0.5
    }

    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len()).map(|f| self.triangle_area(f)).sum()
    }

    /// Area-weighted average of incident face normals, normalized.
    pub fn compute_vertex_normals(&mut self) {
        let mut acc = vec![Vector3::zeros(); self.vertices.len()];
        for face in &self.faces {
            let n = self.face_cross(face);
            for &v in face {
                acc[v as usize] += n;
            }
        }
        for n in &mut acc {
            let len = n.norm();
            if len > 0.0 {
                *n /= len;
            }
        }
        self.normals = Some(acc);
    }

    /// Split every triangle into four, `iterations` times. Shared edges get a
    /// single midpoint vertex, so a closed mesh stays closed.
    pub fn subdivide_midpoint(&self, iterations: usize) -> Self {
        let mut mesh = self.clone();
        for _ in 0..iterations {
            mesh = mesh.subdivide_once();
        }
        mesh
    }

    fn subdivide_once(&self) -> Self {
        let mut vertices = self.vertices.clone();
        let mut normals = self.normals.clone();
        let mut faces = Vec::with_capacity(self.faces.len() * 4);
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();

        let mut midpoint = |a: u32, b: u32| -> u32 {
            let key = if a <= b { (a, b) } else { (b, a) };
            *midpoints.entry(key).or_insert_with(|| {
                let (pa, pb) = (vertices[a as usize], vertices[b as usize]);
                vertices.push(Point3::from((pa.coords + pb.coords) * 0.5));
                if let Some(normals) = &mut normals {
                    let n = normals[a as usize] + normals[b as usize];
                    normals.push(n.try_normalize(0.0).unwrap_or(n));
                }
                (vertices.len() - 1) as u32
            })
        };

        for &[v0, v1, v2] in &self.faces {
            let m01 = midpoint(v0, v1);
            let m12 = midpoint(v1, v2);
            let m20 = midpoint(v2, v0);
            faces.push([v0, m01, m20]);
            faces.push([v1, m12, m01]);
            faces.push([v2, m20, m12]);
            faces.push([m01, m12, m20]);
        }

        Self {
            vertices,
            faces,
            normals,
        }
    }

    /// Concatenate `other` onto `self`, offsetting its face indices. Normals are
    /// kept only when both meshes carry them.
    pub fn append(&mut self, other: &TriMesh) {
        let offset = self.vertices.len() as u32;
        let had_vertices = !self.vertices.is_empty();

        self.normals = match (self.normals.take(), &other.normals) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend_from_slice(theirs);
                Some(mine)
            }
            (None, Some(theirs)) if !had_vertices => Some(theirs.clone()),
            _ => None,
        };
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_area_and_winding() {
        let mesh = TriMesh::create_box(1.0, 0.1, 1.0);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.faces.len(), 12);
        assert_relative_eq!(mesh.surface_area(), 2.0 + 4.0 * 0.1, epsilon = 1e-12);

        // Every face normal points away from the box center.
        let c = mesh.center();
        for face in &mesh.faces {
            let [a, _, _] = mesh.corners(face);
            assert!(mesh.face_cross(face).dot(&(a - c)) > 0.0);
        }
    }

    #[test]
    fn cylinder_topology() {
        let mesh = TriMesh::create_cylinder(0.05, 0.12, 20, 4);
        assert_eq!(mesh.vertices.len(), 2 + 20 * 5);
        assert_eq!(mesh.faces.len(), 2 * 20 + 2 * 20 * 4);
        assert_eq!(mesh.vertices[0], Point3::new(0.0, 0.0, 0.06));
        assert_eq!(mesh.vertices[1], Point3::new(0.0, 0.0, -0.06));

        // Polygonal approximation stays just under the analytic area.
        let exact = 2.0 * std::f64::consts::PI * 0.05 * (0.05 + 0.12);
        let area = mesh.surface_area();
        assert!(area < exact && area > 0.97 * exact);
    }

    #[test]
    fn subdivision_preserves_area_and_shares_midpoints() {
        let mesh = TriMesh::create_box(2.0, 1.0, 0.5);
        let fine = mesh.subdivide_midpoint(2);
        assert_eq!(fine.faces.len(), 12 * 16);
        assert_relative_eq!(fine.surface_area(), mesh.surface_area(), epsilon = 1e-9);

        // Closed: each undirected edge is used by exactly two triangles.
        let mut uses: HashMap<(u32, u32), usize> = HashMap::new();
        for f in &fine.faces {
            for k in 0..3 {
                let (a, b) = (f[k], f[(k + 1) % 3]);
                *uses.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        assert!(uses.values().all(|&n| n == 2));
    }

    #[test]
    fn subdivision_carries_normals() {
        let mut mesh = TriMesh::create_box(1.0, 1.0, 1.0);
        mesh.compute_vertex_normals();
        let fine = mesh.subdivide_midpoint(1);
        let normals = fine.normals.as_ref().unwrap();
        assert_eq!(normals.len(), fine.vertices.len());
        for n in normals {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rotation_about_center_keeps_center() {
        let mut mesh = TriMesh::create_box(0.4, 0.02, 0.6);
        mesh.translate(Vector3::new(-0.2, 0.02, -0.3));
        let before = mesh.center();
        let area = mesh.surface_area();

        let rot = Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_6);
        mesh.rotate(&rot, before);

        let after = mesh.center();
        assert_relative_eq!(before, after, epsilon = 1e-12);
        assert_relative_eq!(mesh.surface_area(), area, epsilon = 1e-12);
    }

    #[test]
    fn append_offsets_indices() {
        let mut a = TriMesh::create_box(1.0, 1.0, 1.0);
        let b = TriMesh::create_box(1.0, 1.0, 1.0);
        a.append(&b);
        assert_eq!(a.vertices.len(), 16);
        assert_eq!(a.faces.len(), 24);
        assert_eq!(a.faces[12], [12, 15, 13]);
        assert!(a.normals.is_none());
    }
}
