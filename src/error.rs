use std::path::PathBuf;
use thiserror::Error;

/// An image file that could not be read or decoded. Per-file; the batch skips it.
#[derive(Error, Debug)]
#[error("Failed to decode {}: {reason}", path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    pub reason: String,
}

/// Detector invocation failed for one image. Treated as "no detections".
#[derive(Error, Debug, Clone)]
pub enum InferenceError {
    #[error("Unsupported image shape {width}x{height}")]
    InvalidShape { width: u32, height: u32 },
    #[error("Model run failed: {0}")]
    ModelRun(String),
    #[error("Unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),
}

/// Summary ledger or output collection could not be written. Batch-fatal.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to open summary {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write summary row for {file_name}: {source}")]
    Write {
        file_name: String,
        source: std::io::Error,
    },
    #[error("Failed to copy {file_name} to output directory: {source}")]
    Copy {
        file_name: String,
        source: std::io::Error,
    },
    #[error("Failed to read summary {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cluster_count must be at least 1")]
    ZeroClusters,
    #[error("detect_batch_size must be at least 1")]
    ZeroBatchSize,
    #[error("target_classes must not be empty")]
    NoTargetClasses,
    #[error("{name} threshold {value} is outside 0..=255")]
    Threshold { name: &'static str, value: u16 },
    #[error("Unknown detector class '{0}'")]
    UnknownClass(String),
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Errors that end a batch run. Per-image failures never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Cannot read input directory {}: {source}", path.display())]
    InputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Result sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Image error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Batch worker failed: {0}")]
    Worker(String),
}
