//! cloud_io: point cloud container and the file formats surfgen reads and writes.
//!
//! - `PointCloud` stores f64 positions plus optional per-point colors (u8 RGB)
//!   and normals (f64), kept as parallel arrays.
//! - PLY: binary little-endian (default) or ASCII writer; reader accepts any
//!   PLY encoding with float or double coordinates.
//! - OFF: vertex positions and polygon index lists.
//! - PCD: ASCII variant only.
//!
//! PLY layout written by `write_ply`:
//!   ply
//!   format binary_little_endian 1.0
//!   element vertex N
//!   property double x / y / z
//!   property double nx / ny / nz      (if normals)
//!   property uchar red / green / blue (if colors)
//!   end_header
//!   N records, fields in header order

mod error;
pub mod off;
pub mod pcd;
pub mod ply;

use rand::Rng;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use error::{CloudError, CloudResult};
pub use off::{parse_off, read_off, OffMesh};
pub use pcd::read_pcd;
pub use ply::{read_ply, write_ply, PlyEncoding};

/// Ordered set of points with optional per-point attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub positions: Vec<[f64; 3]>,
    pub colors: Option<Vec<[u8; 3]>>,
    pub normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: Vec<[f64; 3]>) -> Self {
        Self {
            positions,
            colors: None,
            normals: None,
        }
    }

    /// Build a cloud from a generic numeric table; every row must be an xyz triple.
    pub fn from_rows(rows: &[Vec<f64>]) -> CloudResult<Self> {
        if rows.is_empty() {
            return Err(CloudError::shape("point table is empty"));
        }

        let mut positions = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match row.as_slice() {
                &[x, y, z] => positions.push([x, y, z]),
                other => {
                    return Err(CloudError::shape(format!(
                        "row {index} has {} columns, expected 3",
                        other.len()
                    )))
                }
            }
        }

        Ok(Self::from_positions(positions))
    }

    pub fn with_normals(mut self, normals: Vec<[f64; 3]>) -> CloudResult<Self> {
        if normals.len() != self.positions.len() {
            return Err(CloudError::shape(format!(
                "{} normals for {} points",
                normals.len(),
                self.positions.len()
            )));
        }
        self.normals = Some(normals);
        Ok(self)
    }

    pub fn with_colors(mut self, colors: Vec<[u8; 3]>) -> CloudResult<Self> {
        if colors.len() != self.positions.len() {
            return Err(CloudError::shape(format!(
                "{} colors for {} points",
                colors.len(),
                self.positions.len()
            )));
        }
        self.colors = Some(colors);
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check the attribute arrays against the position count.
    pub fn validate(&self) -> CloudResult<()> {
        if let Some(colors) = &self.colors {
            if colors.len() != self.positions.len() {
                return Err(CloudError::shape("colors length != points length"));
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(CloudError::shape("normals length != points length"));
            }
        }
        Ok(())
    }

    /// Keep the points at `indices`, in the given order. Attributes follow.
    /// Out-of-range indices are ignored.
    pub fn select_by_index(&self, indices: &[usize]) -> PointCloud {
        let keep: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.positions.len())
            .collect();

        PointCloud {
            positions: keep.iter().map(|&i| self.positions[i]).collect(),
            colors: self
                .colors
                .as_ref()
                .map(|c| keep.iter().map(|&i| c[i]).collect()),
            normals: self
                .normals
                .as_ref()
                .map(|n| keep.iter().map(|&i| n[i]).collect()),
        }
    }

    /// Axis-aligned bounds as `(min, max)`; `None` for an empty cloud.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.positions.first()?;
        let init = (first, first);

        Some(self.positions.iter().fold(init, |(mut lo, mut hi), p| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
            (lo, hi)
        }))
    }

    /// Length of the bounding-box diagonal (0 for an empty cloud).
    pub fn extent(&self) -> f64 {
        self.bounds()
            .map(|(lo, hi)| {
                let dx = hi[0] - lo[0];
                let dy = hi[1] - lo[1];
                let dz = hi[2] - lo[2];
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .unwrap_or(0.0)
    }

    /// Random subset of at most `max_points` points, without replacement and
    /// in original order. Returns a clone when the cloud is already small enough.
    pub fn random_subsample<R: Rng + ?Sized>(
        &self,
        max_points: usize,
        rng: &mut R,
    ) -> CloudResult<PointCloud> {
        if max_points == 0 {
            return Err(CloudError::InvalidParameter {
                reason: "max_points must be > 0".to_string(),
            });
        }
        if self.len() <= max_points {
            return Ok(self.clone());
        }

        let mut picked = rand::seq::index::sample(rng, self.len(), max_points).into_vec();
        picked.sort_unstable();
        Ok(self.select_by_index(&picked))
    }
}

/// A loaded file: the cloud plus polygon faces when the format carries them.
#[derive(Debug, Clone, Default)]
pub struct CloudData {
    pub cloud: PointCloud,
    pub faces: Option<Vec<Vec<u32>>>,
}

/// Formats recognised by [`load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudFormat {
    Ply,
    Pcd,
    Off,
}

impl CloudFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ply" => Some(Self::Ply),
            "pcd" => Some(Self::Pcd),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> CloudResult<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        Self::from_extension(ext).ok_or_else(|| CloudError::UnsupportedFormat {
            extension: ext.to_string(),
        })
    }
}

/// Load any supported file, dispatching on its extension.
///
/// The existence check comes first, so a missing `.xyz` file reports
/// `NotFound` rather than `UnsupportedFormat`.
pub fn load<P: AsRef<Path>>(path: P) -> CloudResult<CloudData> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CloudError::NotFound {
            path: path.to_path_buf(),
        });
    }

    match CloudFormat::from_path(path)? {
        CloudFormat::Ply => read_ply(path),
        CloudFormat::Pcd => Ok(CloudData {
            cloud: read_pcd(path)?,
            faces: None,
        }),
        CloudFormat::Off => {
            let mesh = read_off(path)?;
            Ok(CloudData {
                cloud: PointCloud::from_positions(mesh.positions),
                faces: (!mesh.faces.is_empty()).then_some(mesh.faces),
            })
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk {
    Number(u64),
    Text(String),
}

/// Sort key that orders `plane_2` before `plane_10`.
fn natural_key(name: &str) -> Vec<NameChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for ch in name.chars() {
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != in_digits {
            chunks.push(finish_chunk(&current, in_digits));
            current.clear();
        }
        in_digits = is_digit;
        current.push(ch);
    }

    if !current.is_empty() {
        chunks.push(finish_chunk(&current, in_digits));
    }

    chunks
}

fn finish_chunk(text: &str, digits: bool) -> NameChunk {
    if digits {
        // Runs too long for u64 fall back to lexical order.
        text.parse()
            .map(NameChunk::Number)
            .unwrap_or_else(|_| NameChunk::Text(text.to_string()))
    } else {
        NameChunk::Text(text.to_string())
    }
}

fn compare_natural(a: &Path, b: &Path) -> Ordering {
    let a_name = a.to_string_lossy();
    let b_name = b.to_string_lossy();
    natural_key(&a_name).cmp(&natural_key(&b_name))
}

/// Every supported cloud file below `dir` (hidden files skipped), in natural order.
pub fn list_clouds<P: AsRef<Path>>(dir: P) -> CloudResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Err(CloudError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .filter(|path| CloudFormat::from_path(path).is_ok())
        .collect();

    files.sort_by(|a, b| compare_natural(a, b));
    log::debug!("found {} cloud files under {}", files.len(), dir.display());

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn from_rows_rejects_non_triples() {
        let rows = vec![vec![0.0, 1.0, 2.0], vec![1.0, 2.0]];
        assert!(matches!(
            PointCloud::from_rows(&rows),
            Err(CloudError::InvalidShape { .. })
        ));
        assert!(matches!(
            PointCloud::from_rows(&[]),
            Err(CloudError::InvalidShape { .. })
        ));

        let cloud = PointCloud::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(cloud.positions, vec![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn attribute_lengths_are_checked() {
        let cloud = PointCloud::from_positions(vec![[0.0; 3]; 2]);
        assert!(cloud.clone().with_normals(vec![[0.0, 0.0, 1.0]]).is_err());
        let cloud = cloud.with_colors(vec![[1, 2, 3], [4, 5, 6]]).unwrap();
        assert!(cloud.validate().is_ok());
    }

    #[test]
    fn select_by_index_carries_attributes() {
        let cloud = PointCloud::from_positions(vec![[0.0; 3], [1.0; 3], [2.0; 3]])
            .with_colors(vec![[0, 0, 0], [1, 1, 1], [2, 2, 2]])
            .unwrap();

        let picked = cloud.select_by_index(&[2, 0, 7]);
        assert_eq!(picked.positions, vec![[2.0; 3], [0.0; 3]]);
        assert_eq!(picked.colors, Some(vec![[2, 2, 2], [0, 0, 0]]));
        assert!(picked.normals.is_none());
    }

    #[test]
    fn bounds_and_extent() {
        let cloud = PointCloud::from_positions(vec![[-1.0, 0.0, 2.0], [2.0, 4.0, 2.0]]);
        let (lo, hi) = cloud.bounds().unwrap();
        assert_eq!(lo, [-1.0, 0.0, 2.0]);
        assert_eq!(hi, [2.0, 4.0, 2.0]);
        assert!((cloud.extent() - 5.0).abs() < 1e-12);
        assert!(PointCloud::new().bounds().is_none());
    }

    #[test]
    fn subsample_caps_size_and_keeps_order() {
        let positions: Vec<[f64; 3]> = (0..100).map(|i| [i as f64, 0.0, 0.0]).collect();
        let cloud = PointCloud::from_positions(positions);
        let mut rng = StdRng::seed_from_u64(7);

        let sub = cloud.random_subsample(10, &mut rng).unwrap();
        assert_eq!(sub.len(), 10);
        assert!(sub.positions.windows(2).all(|w| w[0][0] < w[1][0]));
        assert_eq!(cloud.random_subsample(500, &mut rng).unwrap().len(), 100);
    }

    #[test]
    fn zero_point_subsample_is_rejected() {
        let cloud = PointCloud::from_positions(vec![[0.0; 3]; 4]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            cloud.random_subsample(0, &mut rng),
            Err(CloudError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn load_reports_missing_and_unsupported() {
        let dir = tempdir().unwrap();

        let missing = dir.path().join("nope.ply");
        assert!(matches!(load(&missing), Err(CloudError::NotFound { .. })));

        let xyz = dir.path().join("cloud.xyz");
        fs::write(&xyz, "0 0 0\n").unwrap();
        assert!(matches!(
            load(&xyz),
            Err(CloudError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn load_off_returns_faces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tri.OFF");
        fs::write(&path, "OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n").unwrap();

        let data = load(&path).unwrap();
        assert_eq!(data.cloud.len(), 3);
        assert_eq!(data.faces, Some(vec![vec![0, 1, 2]]));
    }

    #[test]
    fn list_clouds_sorts_naturally() {
        let dir = tempdir().unwrap();
        for name in ["smooth_plane_10.ply", "smooth_plane_2.ply", "smooth_plane_1.ply"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(dir.path().join(".hidden.ply"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let names: Vec<String> = list_clouds(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec!["smooth_plane_1.ply", "smooth_plane_2.ply", "smooth_plane_10.ply"]
        );
    }
}
