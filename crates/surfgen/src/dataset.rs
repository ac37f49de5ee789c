//! On-disk dataset layout and the two end-to-end pipelines.
//!
//! ```text
//! <root>/train/bumpy_plane_train_{i}.ply
//! <root>/validation/bumpy_plane_val_{i}.ply
//! <root>/test/bumpy_plane_test_{i}.ply
//! <root>/smooth/smooth_plane_{i}.ply
//! <root>/manifest.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cloud_io::{write_ply, PlyEncoding, PointCloud};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::defects::{to_noisy, to_smooth};
use crate::heightfield::{Features, HeightField, PlaneParams};
use crate::mesh::TriMesh;
use crate::sampling::sample_poisson_disk;
use crate::scene::CompositeScene;
use crate::visibility::extract_visible;
use crate::{make_rng, SynthError, SynthResult};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SMOOTH_DIR: &str = "smooth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }

    pub fn file_prefix(self) -> &'static str {
        match self {
            Split::Train => "bumpy_plane_train_",
            Split::Validation => "bumpy_plane_val_",
            Split::Test => "bumpy_plane_test_",
        }
    }
}

/// How noisy content is distributed across the three splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// One noise realization, written identically to every split.
    #[default]
    Replicate,
    /// A fresh noise realization of the same height field per split.
    Independent,
}

/// File naming under a dataset root. Iteration indices start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split_file(split: Split, index: usize) -> String {
        format!("{}/{}{index}.ply", split.dir_name(), split.file_prefix())
    }

    pub fn smooth_file(index: usize) -> String {
        format!("{SMOOTH_DIR}/smooth_plane_{index}.ply")
    }

    pub fn split_path(&self, split: Split, index: usize) -> PathBuf {
        self.root.join(Self::split_file(split, index))
    }

    pub fn smooth_path(&self, index: usize) -> PathBuf {
        self.root.join(Self::smooth_file(index))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn create_dirs(&self) -> SynthResult<()> {
        for split in Split::ALL {
            fs::create_dir_all(self.root.join(split.dir_name()))?;
        }
        fs::create_dir_all(self.root.join(SMOOTH_DIR))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    /// Number of iterations (each yields one smooth cloud and its noisy pairs).
    pub count: usize,
    pub width: f64,
    pub height: f64,
    pub resolution: usize,
    pub encoding: PlyEncoding,
    /// Run iterations on the rayon pool. Output is identical to a sequential run.
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 50,
            width: 10.0,
            height: 10.0,
            resolution: 100,
            encoding: PlyEncoding::BinaryLittleEndian,
            parallel: false,
        }
    }
}

/// Parameters drawn for a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationParams {
    pub groove_depth: f64,
    pub slope_factor: f64,
    pub bumpiness: f64,
    pub elevation: f64,
}

impl IterationParams {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            groove_depth: rng.gen_range(0.5..2.0),
            slope_factor: rng.gen_range(-0.2..0.2),
            bumpiness: rng.gen_range(0.05..0.15),
            elevation: rng.gen_range(-1.0..1.0),
        }
    }

    fn plane(&self, config: &BatchConfig) -> PlaneParams {
        PlaneParams {
            width: config.width,
            height: config.height,
            resolution: config.resolution,
            groove_depth: self.groove_depth,
            slope_factor: self.slope_factor,
            elevation: self.elevation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub index: usize,
    pub seed: u64,
    pub params: IterationParams,
    pub features: Features,
    /// Paths relative to the dataset root.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Seed of the batch generator, when one was given.
    pub batch_seed: Option<u64>,
    pub split_mode: SplitMode,
    pub width: f64,
    pub height: f64,
    pub resolution: usize,
    pub iterations: Vec<IterationRecord>,
}

pub struct DatasetWriter {
    layout: DatasetLayout,
    split_mode: SplitMode,
}

impl DatasetWriter {
    pub fn new(root: impl Into<PathBuf>, split_mode: SplitMode) -> Self {
        Self {
            layout: DatasetLayout::new(root),
            split_mode,
        }
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// [`write_batch`](Self::write_batch) with a generator built from `seed`,
    /// recording the seed in the manifest.
    pub fn write_seeded(&self, config: &BatchConfig, seed: Option<u64>) -> SynthResult<Manifest> {
        let mut rng = make_rng(seed);
        self.run_batch(config, &mut rng, seed)
    }

    /// Generate and write `config.count` iterations plus the manifest.
    ///
    /// One seed per iteration is drawn from `rng` up front, so sequential and
    /// parallel runs produce the same files. Stops at the first failure;
    /// files already written are left in place.
    pub fn write_batch<R: Rng + ?Sized>(&self, config: &BatchConfig, rng: &mut R) -> SynthResult<Manifest> {
        self.run_batch(config, rng, None)
    }

    fn run_batch<R: Rng + ?Sized>(
        &self,
        config: &BatchConfig,
        rng: &mut R,
        batch_seed: Option<u64>,
    ) -> SynthResult<Manifest> {
        if config.count == 0 {
            return Err(SynthError::invalid("count must be > 0"));
        }
        PlaneParams {
            width: config.width,
            height: config.height,
            resolution: config.resolution,
            ..PlaneParams::default()
        }
        .validate()?;

        self.layout.create_dirs()?;
        let seeds: Vec<u64> = (0..config.count).map(|_| rng.gen()).collect();

        let iterations = if config.parallel {
            seeds
                .par_iter()
                .enumerate()
                .map(|(k, &seed)| self.write_iteration(k + 1, seed, config))
                .collect::<SynthResult<Vec<_>>>()?
        } else {
            seeds
                .iter()
                .enumerate()
                .map(|(k, &seed)| self.write_iteration(k + 1, seed, config))
                .collect::<SynthResult<Vec<_>>>()?
        };

        let manifest = Manifest {
            batch_seed,
            split_mode: self.split_mode,
            width: config.width,
            height: config.height,
            resolution: config.resolution,
            iterations,
        };
        let path = self.layout.manifest_path();
        fs::write(&path, serde_json::to_vec_pretty(&manifest)?)?;
        info!(
            "wrote {} iterations to {} ({:?} splits)",
            config.count,
            self.layout.root().display(),
            self.split_mode
        );
        Ok(manifest)
    }

    fn write_iteration(&self, index: usize, seed: u64, config: &BatchConfig) -> SynthResult<IterationRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        let params = IterationParams::random(&mut rng);
        let (field, features) = HeightField::generate_detailed(&params.plane(config), &mut rng)?;

        let mut files = Vec::with_capacity(4);
        let mut emit = |relative: String, cloud: &PointCloud| -> SynthResult<()> {
            write_ply(self.layout.root().join(&relative), cloud, config.encoding)?;
            debug!("wrote {relative} ({} points)", cloud.len());
            files.push(relative);
            Ok(())
        };

        match self.split_mode {
            SplitMode::Replicate => {
                let noisy = to_noisy(&field, params.bumpiness, &mut rng)?;
                for split in Split::ALL {
                    emit(DatasetLayout::split_file(split, index), &noisy)?;
                }
            }
            SplitMode::Independent => {
                for split in Split::ALL {
                    let noisy = to_noisy(&field, params.bumpiness, &mut rng)?;
                    emit(DatasetLayout::split_file(split, index), &noisy)?;
                }
            }
        }
        emit(DatasetLayout::smooth_file(index), &to_smooth(&field))?;

        info!(
            "iteration {index}: groove_depth={:.3} slope={:.3} bumpiness={:.3} elevation={:.3}",
            params.groove_depth, params.slope_factor, params.bumpiness, params.elevation
        );
        Ok(IterationRecord {
            index,
            seed,
            params,
            features,
            files,
        })
    }
}

/// Settings of the single-viewpoint scan of the composite workpiece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
    pub point_count: usize,
    pub camera: [f64; 3],
    /// Spherical flip radius for hidden-point removal.
    pub radius: f64,
    pub subdivisions: usize,
    pub encoding: PlyEncoding,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            point_count: 20_000,
            camera: [2.0, 2.0, 2.0],
            radius: 2.5,
            subdivisions: 2,
            encoding: PlyEncoding::BinaryLittleEndian,
        }
    }
}

/// The merged workpiece with vertex normals recomputed on the final,
/// subdivided geometry.
pub fn scan_mesh(subdivisions: usize) -> TriMesh {
    let mut mesh = CompositeScene::workpiece(subdivisions).merge();
    mesh.compute_vertex_normals();
    mesh
}

/// Sample the workpiece surface and keep what the camera sees.
pub fn simulate_scan<R: Rng + ?Sized>(config: &ScanConfig, rng: &mut R) -> SynthResult<PointCloud> {
    let mesh = scan_mesh(config.subdivisions);
    let sampled = sample_poisson_disk(&mesh, config.point_count, rng)?;
    let visible = extract_visible(&sampled, config.camera, config.radius)?;
    Ok(visible.apply(&sampled))
}

/// [`simulate_scan`], written as one PLY at `path`.
pub fn write_scan<R: Rng + ?Sized>(
    path: impl AsRef<Path>,
    config: &ScanConfig,
    rng: &mut R,
) -> SynthResult<PointCloud> {
    let path = path.as_ref();
    let cloud = simulate_scan(config, rng)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_ply(path, &cloud, config.encoding)?;
    info!("wrote {} visible points to {}", cloud.len(), path.display());
    Ok(cloud)
}
