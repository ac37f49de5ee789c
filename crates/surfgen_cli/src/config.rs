use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// `surfgen` - synthetic point cloud benchmarks.
///
/// Generates paired noisy / ground-truth height-field clouds for denoising
/// and completion experiments, and single-viewpoint scans of a composite
/// workpiece.
#[derive(Parser, Debug)]
#[command(name = "surfgen", version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the train/validation/test/smooth plane dataset.
    Planes(PlanesArgs),
    /// Sample the workpiece and keep the surface visible from one camera.
    Scan(ScanArgs),
    /// Summarize a cloud file, or every cloud file below a directory.
    Inspect(InspectArgs),
}

/// How noisy clouds are distributed across splits.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SplitModeArg {
    /// The same noisy cloud in every split.
    Replicate,
    /// An independent noise realization per split.
    Independent,
}

impl std::fmt::Display for SplitModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SplitModeArg::Replicate => "replicate",
            SplitModeArg::Independent => "independent",
        };

        f.write_str(s)
    }
}

#[derive(clap::Args, Debug)]
pub struct PlanesArgs {
    /// Dataset root; split directories are created below it.
    #[arg(long, env = "SURFGEN_OUTPUT_DIR", default_value = "point_clouds_simulated")]
    pub output_dir: PathBuf,

    /// Number of iterations to generate.
    #[arg(long, default_value_t = 50)]
    pub count: usize,

    /// Grid samples per axis.
    #[arg(long, default_value_t = 100)]
    pub resolution: usize,

    #[arg(long, default_value_t = 10.0)]
    pub width: f64,

    #[arg(long, default_value_t = 10.0)]
    pub height: f64,

    /// Seed for reproducible output; entropy when omitted.
    #[arg(long, env = "SURFGEN_SEED")]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = SplitModeArg::Replicate)]
    pub split_mode: SplitModeArg,

    /// Generate iterations on all cores.
    #[arg(long, default_value_t = false)]
    pub parallel: bool,

    /// Write ASCII PLY instead of binary little-endian.
    #[arg(long, default_value_t = false)]
    pub ascii: bool,
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    #[arg(long, env = "SURFGEN_SCAN_OUTPUT", default_value = "visible_surface.ply")]
    pub output: PathBuf,

    /// Surface samples drawn before visibility culling.
    #[arg(long, default_value_t = 20_000)]
    pub points: usize,

    /// Camera position as `x,y,z`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [2.0, 2.0, 2.0])]
    pub camera: Vec<f64>,

    /// Spherical flip radius for hidden-point removal.
    #[arg(long, default_value_t = 2.5)]
    pub radius: f64,

    /// Midpoint subdivision rounds per scene part.
    #[arg(long, default_value_t = 2)]
    pub subdivisions: usize,

    #[arg(long, env = "SURFGEN_SEED")]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub ascii: bool,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// A `.ply`, `.pcd` or `.off` file, or a directory to scan.
    pub path: PathBuf,

    /// Summarize a random subset of at most this many points per file.
    #[arg(long)]
    pub max_points: Option<usize>,

    #[arg(long, env = "SURFGEN_SEED")]
    pub seed: Option<u64>,
}
