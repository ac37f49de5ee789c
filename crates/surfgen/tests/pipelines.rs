use cloud_io::{list_clouds, load, PlyEncoding};
use rand::rngs::StdRng;
use rand::SeedableRng;
use surfgen::dataset::write_scan;
use surfgen::{BatchConfig, DatasetWriter, Manifest, ScanConfig, Split, SplitMode};

#[test]
fn planes_dataset_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let config = BatchConfig {
        count: 4,
        resolution: 20,
        encoding: PlyEncoding::Ascii,
        ..BatchConfig::default()
    };

    let writer = DatasetWriter::new(dir.path().join("point_clouds_simulated"), SplitMode::Replicate);
    let manifest = writer.write_seeded(&config, Some(2024)).unwrap();
    assert_eq!(manifest.iterations.len(), 4);

    let files = list_clouds(writer.layout().root()).unwrap();
    assert_eq!(files.len(), 4 * 4);

    // Numeric suffixes sort naturally.
    let smooth: Vec<_> = files
        .iter()
        .filter(|p| p.starts_with(writer.layout().root().join("smooth")))
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        smooth,
        ["smooth_plane_1.ply", "smooth_plane_2.ply", "smooth_plane_3.ply", "smooth_plane_4.ply"]
    );

    for i in 1..=4 {
        let noisy = load(writer.layout().split_path(Split::Train, i)).unwrap().cloud;
        let clean = load(writer.layout().smooth_path(i)).unwrap().cloud;
        assert_eq!(noisy.len(), 400);
        assert_eq!(clean.len(), 400);
        for (n, c) in noisy.positions.iter().zip(&clean.positions) {
            assert!((n[0] - c[0]).abs() < 1e-6 && (n[1] - c[1]).abs() < 1e-6);
        }
    }
}

#[test]
fn same_seed_same_dataset() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let config = BatchConfig {
        count: 2,
        resolution: 16,
        ..BatchConfig::default()
    };

    let first = DatasetWriter::new(a.path(), SplitMode::Independent)
        .write_seeded(&config, Some(5))
        .unwrap();
    let second = DatasetWriter::new(b.path(), SplitMode::Independent)
        .write_seeded(&config, Some(5))
        .unwrap();
    assert_eq!(first.iterations, second.iterations);

    let on_disk: Manifest =
        serde_json::from_slice(&std::fs::read(a.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(on_disk, first);
}

#[test]
fn scan_writes_visible_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scans").join("visible_surface.ply");
    let config = ScanConfig {
        point_count: 2000,
        subdivisions: 1,
        ..ScanConfig::default()
    };

    let written = write_scan(&path, &config, &mut StdRng::seed_from_u64(11)).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(loaded.cloud.len(), written.len());
    assert!(loaded.cloud.len() <= config.point_count);
    assert!(loaded.cloud.has_normals());
    assert!(loaded.faces.is_none());

    let (lo, hi) = loaded.cloud.bounds().unwrap();
    for k in [0, 2] {
        assert!(lo[k] >= -0.5 - 1e-9 && hi[k] <= 0.5 + 1e-9);
    }
}
