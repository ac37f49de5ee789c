//! The composite workpiece scanned by the visibility pipeline.

use log::debug;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::mesh::TriMesh;

/// How part meshes are combined into one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Plain buffer concatenation. Overlapping volumes are left intersecting.
    #[default]
    Concatenate,
}

#[derive(Debug, Clone)]
pub struct ScenePart {
    pub name: &'static str,
    pub mesh: TriMesh,
}

#[derive(Debug, Clone, Default)]
pub struct CompositeScene {
    parts: Vec<ScenePart>,
    strategy: MergeStrategy,
}

impl CompositeScene {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self {
            parts: Vec::new(),
            strategy,
        }
    }

    pub fn push(&mut self, name: &'static str, mesh: TriMesh) {
        self.parts.push(ScenePart { name, mesh });
    }

    pub fn parts(&self) -> &[ScenePart] {
        &self.parts
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn merge(&self) -> TriMesh {
        match self.strategy {
            MergeStrategy::Concatenate => {
                let mut merged = TriMesh::default();
                for part in &self.parts {
                    merged.append(&part.mesh);
                }
                merged
            }
        }
    }

    /// Grooved slab with a central post and a tilted ramp, Y up, roughly unit size.
    ///
    /// Every part gets vertex normals and `subdivisions` rounds of midpoint
    /// subdivision before it is added.
    pub fn workpiece(subdivisions: usize) -> Self {
        let mut scene = Self::new(MergeStrategy::Concatenate);

        let mut add = |name: &'static str, mut mesh: TriMesh| {
            mesh.compute_vertex_normals();
            let mesh = mesh.subdivide_midpoint(subdivisions);
            debug!(
                "scene part {name}: {} vertices, {} faces",
                mesh.vertices.len(),
                mesh.faces.len()
            );
            scene.push(name, mesh);
        };

        add("base_slab", boxed([1.0, 0.1, 1.0], [-0.5, -0.05, -0.5]));
        add("groove_x", boxed([0.1, 0.12, 1.0], [-0.05, -0.06, -0.5]));
        add("groove_z", boxed([1.0, 0.12, 0.1], [-0.5, -0.06, -0.05]));

        let mut post = TriMesh::create_cylinder(0.05, 0.12, 20, 4);
        post.translate(Vector3::new(0.0, -0.06, 0.0));
        add("cylinder", post);

        let mut ramp = boxed([0.4, 0.02, 0.6], [-0.2, 0.02, -0.3]);
        let tilt = Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_6);
        let pivot = ramp.center();
        ramp.rotate(&tilt, pivot);
        add("ramp", ramp);

        scene
    }
}

fn boxed(size: [f64; 3], offset: [f64; 3]) -> TriMesh {
    let mut mesh = TriMesh::create_box(size[0], size[1], size[2]);
    mesh.translate(Vector3::from(offset));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn workpiece_has_five_parts() {
        let scene = CompositeScene::workpiece(0);
        let names: Vec<_> = scene.parts().iter().map(|p| p.name).collect();
        assert_eq!(names, ["base_slab", "groove_x", "groove_z", "cylinder", "ramp"]);
        assert_eq!(scene.strategy(), MergeStrategy::Concatenate);
    }

    #[test]
    fn merge_concatenates_buffers() {
        let scene = CompositeScene::workpiece(1);
        let merged = scene.merge();

        let vertices: usize = scene.parts().iter().map(|p| p.mesh.vertices.len()).sum();
        let faces: usize = scene.parts().iter().map(|p| p.mesh.faces.len()).sum();
        assert_eq!(merged.vertices.len(), vertices);
        assert_eq!(merged.faces.len(), faces);
        assert_eq!(merged.normals.as_ref().map(Vec::len), Some(vertices));

        let area: f64 = scene.parts().iter().map(|p| p.mesh.surface_area()).sum();
        assert_relative_eq!(merged.surface_area(), area, epsilon = 1e-9);
    }

    #[test]
    fn slab_spans_unit_square() {
        let scene = CompositeScene::workpiece(2);
        let slab = &scene.parts()[0].mesh;
        let (mut lo, mut hi) = ([f64::MAX; 3], [f64::MIN; 3]);
        for v in &slab.vertices {
            for k in 0..3 {
                lo[k] = lo[k].min(v[k]);
                hi[k] = hi[k].max(v[k]);
            }
        }
        assert_relative_eq!(lo[0], -0.5);
        assert_relative_eq!(hi[0], 0.5);
        assert_relative_eq!(lo[1], -0.05);
        assert_relative_eq!(hi[1], 0.05);
        assert_eq!(slab.faces.len(), 12 * 16);
    }

    #[test]
    fn ramp_is_tilted_thirty_degrees() {
        let scene = CompositeScene::workpiece(0);
        let ramp = &scene.parts()[4].mesh;
        // Vertices 0 and 2 bound the original Z edge of the ramp's underside.
        let edge = ramp.vertices[2] - ramp.vertices[0];
        assert_relative_eq!(edge.norm(), 0.6, epsilon = 1e-12);
        // Positive rotation about X lifts +Z toward -Y.
        assert_relative_eq!(edge.y.atan2(edge.z), -std::f64::consts::FRAC_PI_6, epsilon = 1e-12);
    }
}
