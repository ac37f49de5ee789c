mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cloud_io::{list_clouds, load, PlyEncoding, PointCloud};
use log::{info, warn};
use rand::rngs::StdRng;
use std::path::Path;
use std::time::Instant;
use surfgen::dataset::write_scan;
use surfgen::{make_rng, BatchConfig, DatasetWriter, ScanConfig, SplitMode};

use crate::config::{Command, Config, InspectArgs, PlanesArgs, ScanArgs, SplitModeArg};

fn encoding(ascii: bool) -> PlyEncoding {
    if ascii {
        PlyEncoding::Ascii
    } else {
        PlyEncoding::BinaryLittleEndian
    }
}

fn run_planes(args: &PlanesArgs) -> Result<()> {
    let split_mode = match args.split_mode {
        SplitModeArg::Replicate => SplitMode::Replicate,
        SplitModeArg::Independent => SplitMode::Independent,
    };
    let batch = BatchConfig {
        count: args.count,
        width: args.width,
        height: args.height,
        resolution: args.resolution,
        encoding: encoding(args.ascii),
        parallel: args.parallel,
    };
    info!(
        "Generating {} planes ({}x{}, split mode {}) into {}",
        batch.count,
        batch.resolution,
        batch.resolution,
        args.split_mode,
        args.output_dir.display()
    );

    let writer = DatasetWriter::new(&args.output_dir, split_mode);
    let manifest = writer
        .write_seeded(&batch, args.seed)
        .with_context(|| format!("Failed to write dataset under {}", args.output_dir.display()))?;

    info!(
        "Dataset complete: {} iterations, manifest at {}",
        manifest.iterations.len(),
        writer.layout().manifest_path().display()
    );
    Ok(())
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    let camera: [f64; 3] = match args.camera.as_slice() {
        &[x, y, z] => [x, y, z],
        other => bail!("--camera needs exactly three values, got {}", other.len()),
    };
    let scan = ScanConfig {
        point_count: args.points,
        camera,
        radius: args.radius,
        subdivisions: args.subdivisions,
        encoding: encoding(args.ascii),
    };

    let mut rng = make_rng(args.seed);
    let cloud = write_scan(&args.output, &scan, &mut rng)
        .with_context(|| format!("Failed to write scan to {}", args.output.display()))?;

    info!(
        "Kept {} of {} samples visible from {:?}",
        cloud.len(),
        scan.point_count,
        scan.camera
    );
    Ok(())
}

/// The points a summary is computed over: all of them, or a random subset.
fn preview(cloud: &PointCloud, max_points: Option<usize>, rng: &mut StdRng) -> Result<PointCloud> {
    match max_points {
        Some(max) => Ok(cloud.random_subsample(max, rng)?),
        None => Ok(cloud.clone()),
    }
}

fn describe(path: &Path, max_points: Option<usize>, rng: &mut StdRng) -> Result<()> {
    let data = load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let cloud = &data.cloud;

    info!(
        "{}: {} points, colors: {}, normals: {}, faces: {}",
        path.display(),
        cloud.len(),
        cloud.has_colors(),
        cloud.has_normals(),
        data.faces.as_ref().map_or(0, Vec::len)
    );

    let shown = preview(cloud, max_points, rng)?;
    if shown.len() < cloud.len() {
        info!("  sampled {} of {} points", shown.len(), cloud.len());
    }
    if let Some((lo, hi)) = shown.bounds() {
        info!(
            "  bounds [{:.4}, {:.4}, {:.4}] .. [{:.4}, {:.4}, {:.4}], axis length {:.4}",
            lo[0],
            lo[1],
            lo[2],
            hi[0],
            hi[1],
            hi[2],
            shown.extent() * 0.5
        );
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let mut rng = make_rng(args.seed);
    if !args.path.is_dir() {
        return describe(&args.path, args.max_points, &mut rng);
    }

    let files = list_clouds(&args.path)
        .with_context(|| format!("Failed to list clouds under {}", args.path.display()))?;
    info!("Found {} cloud files under {}", files.len(), args.path.display());

    for file in &files {
        if let Err(err) = describe(file, args.max_points, &mut rng) {
            warn!("Skipping {}: {:#}", file.display(), err);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::parse();
    let start = Instant::now();

    match &config.command {
        Command::Planes(args) => run_planes(args)?,
        Command::Scan(args) => run_scan(args)?,
        Command::Inspect(args) => run_inspect(args)?,
    }

    info!("Done in {:.2?}", start.elapsed());
    Ok(())
}
