pub mod color;
pub mod config;
pub mod detection;
pub mod error;
pub mod mask;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod sink;
pub mod source;

pub use color::{ColorExtractor, DominantColors, FallbackReason, SelectionPath};
pub use config::PipelineConfig;
pub use detection::{VehicleDetector, YoloDetector, YoloParams};
pub use error::{ConfigError, DecodeError, InferenceError, PipelineError, SinkError};
pub use mask::{VehicleMask, build_mask};
pub use models::{
    BatchSummary, BoundingBox, ColorCluster, ColorSpace, Detection, DetectionResult, ImageRecord,
    SummaryRow,
};
pub use pipeline::{BatchHandle, BatchReport, BatchState, ImageAnalysis, Pipeline};
pub use progress::{CancelToken, ChannelProgress, NoProgress, ProgressEvent, ProgressSink};
pub use sink::{CsvResultSink, MemorySink, ResultSink};
pub use source::{DecodedImage, ImageSource};
