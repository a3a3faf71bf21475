mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from carcolors for tests
pub use carcolors::{
    BoundingBox, CancelToken, ColorSpace, Detection, InferenceError, MemorySink, NoProgress,
    Pipeline, PipelineConfig, PipelineError, ProgressEvent, SummaryRow, VehicleDetector,
    VehicleMask,
};
