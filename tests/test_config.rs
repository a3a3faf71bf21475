mod common;

use carcolors::ConfigError;
use carcolors::detection::coco;
use common::*;
use std::sync::Arc;

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.cluster_count, 3);
    assert_eq!(config.saturation_threshold, 50);
    assert_eq!(config.value_threshold, 50);
    assert_eq!(
        config.target_classes.iter().copied().collect::<Vec<_>>(),
        vec![coco::CAR, coco::BUS, coco::TRUCK]
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_partial_toml() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("carcolors.toml");
    std::fs::write(
        &path,
        "cluster_count = 5\ntarget_classes = [2]\nsummary_path = \"ledger.csv\"\nseed = 9\n",
    )?;

    let config = PipelineConfig::from_file(&path)?;

    assert_eq!(config.cluster_count, 5);
    assert_eq!(config.target_classes.len(), 1);
    assert_eq!(config.summary_path, std::path::PathBuf::from("ledger.csv"));
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.value_threshold, 50);
    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "saturation_threshold = 300\n")?;
    assert!(matches!(
        PipelineConfig::from_file(&path),
        Err(ConfigError::Threshold { name: "saturation", value: 300 })
    ));

    std::fs::write(&path, "cluster_count = \"three\"\n")?;
    assert!(matches!(PipelineConfig::from_file(&path), Err(ConfigError::Parse { .. })));

    let zero = PipelineConfig {
        cluster_count: 0,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        Pipeline::new(Arc::new(FixedDetector(Vec::new())), zero),
        Err(ConfigError::ZeroClusters)
    ));
    Ok(())
}

#[test]
fn test_target_labels_accept_names_and_ids() -> anyhow::Result<()> {
    let config = PipelineConfig::default().with_target_labels(&["Car", "motorcycle", "7"])?;
    assert_eq!(config.target_classes.iter().copied().collect::<Vec<_>>(), vec![2, 3, 7]);

    let err = PipelineConfig::default().with_target_labels(&["spaceship"]);
    assert!(matches!(err, Err(ConfigError::UnknownClass(label)) if label == "spaceship"));
    Ok(())
}
