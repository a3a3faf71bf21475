use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::detection::coco;
use crate::error::ConfigError;

/// Immutable configuration shared by every image of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of dominant colors to extract
    pub cluster_count: usize,
    /// Detector class ids treated as "vehicle"
    pub target_classes: BTreeSet<u32>,
    /// Pixels with saturation at or below this are discarded before clustering
    pub saturation_threshold: u16,
    /// Pixels with value at or below this are discarded before clustering
    pub value_threshold: u16,
    /// Where images with a vehicle are copied
    pub output_dir: PathBuf,
    /// CSV ledger path
    pub summary_path: PathBuf,
    /// Images handed to the detector per call
    pub detect_batch_size: usize,
    /// Fixed k-means seed; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Lloyd iteration cap
    pub max_iterations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cluster_count: 3,
            target_classes: coco::DEFAULT_VEHICLE_CLASSES.iter().copied().collect(),
            saturation_threshold: 50,
            value_threshold: 50,
            output_dir: PathBuf::from("output/images"),
            summary_path: PathBuf::from("output.csv"),
            detect_batch_size: 1,
            seed: None,
            max_iterations: 300,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_count == 0 {
            return Err(ConfigError::ZeroClusters);
        }
        if self.detect_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.target_classes.is_empty() {
            return Err(ConfigError::NoTargetClasses);
        }
        for (name, value) in [
            ("saturation", self.saturation_threshold),
            ("value", self.value_threshold),
        ] {
            if value > 255 {
                return Err(ConfigError::Threshold { name, value });
            }
        }
        Ok(())
    }

    /// Replace the target set with classes given by COCO label or numeric id.
    pub fn with_target_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Result<Self, ConfigError> {
        let mut classes = BTreeSet::new();
        for label in labels {
            let label = label.as_ref().trim();
            let id = label
                .parse::<u32>()
                .ok()
                .or_else(|| coco::class_id(label))
                .ok_or_else(|| ConfigError::UnknownClass(label.to_string()))?;
            classes.insert(id);
        }
        self.target_classes = classes;
        Ok(self)
    }
}
