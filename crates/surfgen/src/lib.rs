//! surfgen: synthetic point-cloud benchmark data.
//!
//! Two independent pipelines:
//! - planes: `HeightField::generate` -> `defects::to_noisy` / `defects::to_smooth`
//!   -> `DatasetWriter` (paired noisy / ground-truth clouds per iteration).
//! - scan: `CompositeScene::workpiece` -> `sampling::sample_poisson_disk`
//!   -> `visibility::extract_visible` -> one PLY of the visible surface.
//!
//! Every randomized step takes an explicit `rand::Rng`; nothing reads a
//! process-wide generator.

pub mod dataset;
pub mod defects;
mod error;
pub mod heightfield;
pub mod hull;
pub mod mesh;
pub mod primitives;
pub mod sampling;
pub mod scene;
pub mod visibility;

use rand::rngs::StdRng;
use rand::SeedableRng;

pub use dataset::{BatchConfig, DatasetLayout, DatasetWriter, Manifest, ScanConfig, Split, SplitMode};
pub use error::{SynthError, SynthResult};
pub use heightfield::{Features, HeightField, PlaneParams};
pub use mesh::TriMesh;
pub use primitives::Primitive;
pub use scene::{CompositeScene, MergeStrategy};
pub use visibility::{extract_visible, VisibleSet};

/// Seeded generator when `seed` is given, entropy-seeded otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}
