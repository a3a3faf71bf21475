pub mod coco;
pub mod preprocessing;
pub mod yolo;

use image::DynamicImage;
use std::collections::BTreeSet;

use crate::error::InferenceError;
use crate::models::{BoundingBox, Detection};

pub use yolo::{YoloDetector, YoloParams};

/// Object-detection capability injected into the pipeline.
///
/// Implementations are class-agnostic: they return every detection above
/// the model's own confidence threshold and leave class filtering to the
/// caller. A detector holds no per-image state and is shared read-only
/// across a whole batch.
pub trait VehicleDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError>;

    /// Detect on several images; returns once every image is done.
    /// Results line up with `images`.
    fn detect_batch(&self, images: &[&DynamicImage]) -> Vec<Result<Vec<Detection>, InferenceError>> {
        images.iter().map(|image| self.detect(image)).collect()
    }

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Boxes of target-class detections, clipped to a `width`x`height` image.
///
/// Detector output is not trusted: boxes that are empty or inverted after
/// clipping are dropped with a warning.
pub fn target_boxes<'a>(
    detections: &'a [Detection],
    targets: &'a BTreeSet<u32>,
    width: u32,
    height: u32,
) -> impl Iterator<Item = BoundingBox> + 'a {
    detections
        .iter()
        .filter(move |d| targets.contains(&d.class_id))
        .filter_map(move |d| {
            let clipped = d.bbox.clipped(width, height);
            if clipped.is_none() {
                tracing::warn!(class_id = d.class_id, bbox = ?d.bbox, width, height, "dropping unusable detection box");
            }
            clipped
        })
}
