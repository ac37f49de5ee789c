//! Hidden-point removal: which points of a cloud a single camera can see.
//!
//! Points are spherically flipped about the camera onto a sphere of the given
//! radius; a point is visible exactly when its flipped image is a vertex of the
//! convex hull of all flipped points plus the camera itself.

use cloud_io::PointCloud;
use log::{debug, warn};
use nalgebra::{Point3, Vector3};

use crate::hull::hull_vertices;
use crate::{SynthError, SynthResult};

/// Distance floor for points coinciding with the camera.
const MIN_NORM: f64 = 1e-4;

/// Sorted, de-duplicated indices into the cloud the set was computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    indices: Vec<usize>,
}

impl VisibleSet {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// The visible subset of `cloud`, attributes included.
    pub fn apply(&self, cloud: &PointCloud) -> PointCloud {
        cloud.select_by_index(&self.indices)
    }
}

/// Spherical flip of `p` relative to the camera at the origin.
fn flip(q: Vector3<f64>, radius: f64) -> Point3<f64> {
    let n = q.norm().max(MIN_NORM);
    Point3::from(q + q * (2.0 * (radius - n) / n))
}

/// Points of `cloud` visible from `camera`.
///
/// `radius` controls how aggressively points are culled; values well above the
/// cloud's distance to the camera approach exact visibility.
pub fn extract_visible(cloud: &PointCloud, camera: [f64; 3], radius: f64) -> SynthResult<VisibleSet> {
    if cloud.is_empty() {
        return Err(SynthError::invalid("cannot extract visibility from an empty cloud"));
    }
    if !camera.iter().all(|c| c.is_finite()) {
        return Err(SynthError::invalid(format!("camera position {camera:?} is not finite")));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(SynthError::invalid(format!("radius must be > 0, got {radius}")));
    }

    let eye = Vector3::from(camera);
    let mut flipped: Vec<Point3<f64>> = cloud
        .positions
        .iter()
        .map(|p| flip(Vector3::from(*p) - eye, radius))
        .collect();
    let camera_index = flipped.len();
    flipped.push(Point3::origin());

    let indices = match hull_vertices(&flipped) {
        Some(mut vertices) => {
            vertices.retain(|&i| i != camera_index);
            vertices
        }
        None => {
            warn!(
                "degenerate hull for {} points, treating every point as visible",
                cloud.len()
            );
            (0..cloud.len()).collect()
        }
    };

    debug!(
        "hidden point removal: {} of {} points visible from {camera:?}",
        indices.len(),
        cloud.len()
    );
    Ok(VisibleSet { indices })
}
