use image::DynamicImage;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use std::path::Path;

use super::{VehicleDetector, preprocessing};
use crate::error::InferenceError;
use crate::models::{BoundingBox, Detection};

/// Detector thresholds; defaults match the stock YOLOv5 inference settings
#[derive(Debug, Clone, Copy)]
pub struct YoloParams {
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Raw candidate in source-image float coordinates
#[derive(Debug, Clone, Copy)]
struct Candidate {
    class_id: u32,
    score: f32,
    corners: [f32; 4],
}

/// YOLO object detector running a `.rten` model.
///
/// Accepts both the YOLOv5 output layout `[1, boxes, 5 + classes]`
/// (with objectness) and the YOLOv8 layout `[1, 4 + classes, boxes]`.
pub struct YoloDetector {
    model: Model,
    params: YoloParams,
}

impl YoloDetector {
    pub fn load(model_path: &Path, params: YoloParams) -> anyhow::Result<Self> {
        if !model_path.exists() {
            anyhow::bail!(
                "Detection model not found at {}\n\
                 Convert a YOLOv5 ONNX export with: rten-convert yolov5s.onnx",
                model_path.display()
            );
        }
        let model = Model::load_file(model_path)?;
        tracing::info!(model = %model_path.display(), "loaded detection model");
        Ok(Self { model, params })
    }
}

impl VehicleDetector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(InferenceError::InvalidShape { width, height });
        }

        let letterbox = preprocessing::letterbox(image, self.params.input_size);
        let output: NdTensor<f32, 3> = self
            .model
            .run_one(letterbox.tensor.view().into(), None)
            .map_err(|e| InferenceError::ModelRun(e.to_string()))?
            .try_into()
            .map_err(|e| InferenceError::ModelRun(format!("{:?}", e)))?;

        let candidates = decode_output(&output, &letterbox, self.params.conf_threshold)?;
        let kept = non_max_suppression(candidates, self.params.iou_threshold, self.params.max_detections);

        Ok(kept
            .into_iter()
            .filter_map(|c| {
                let [x1, y1, x2, y2] = c.corners;
                BoundingBox::clamped(x1, y1, x2, y2, width, height).map(|bbox| Detection {
                    class_id: c.class_id,
                    bbox,
                    confidence: c.score,
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "YOLO (rten)"
    }
}

/// Turn raw model output into scored candidates in source-image coordinates.
///
/// The layout is told apart by axis length: v5 exports have many more boxes
/// than attributes (`[1, boxes, 5 + classes]`), v8 exports put the
/// attributes on the middle axis (`[1, 4 + classes, boxes]`) and carry no
/// objectness. Candidates scoring below `conf_threshold` are dropped.
fn decode_output(
    output: &NdTensor<f32, 3>,
    letterbox: &preprocessing::Letterbox,
    conf_threshold: f32,
) -> Result<Vec<Candidate>, InferenceError> {
    let [batch, rows, cols] = output.shape();
    if batch != 1 {
        return Err(InferenceError::OutputShape(vec![batch, rows, cols]));
    }

    let transposed = rows < cols;
    let (num_boxes, attrs) = if transposed { (cols, rows) } else { (rows, cols) };
    let has_objectness = !transposed;
    let class_offset = if has_objectness { 5 } else { 4 };
    if attrs <= class_offset {
        return Err(InferenceError::OutputShape(vec![batch, rows, cols]));
    }

    let at = |b: usize, a: usize| {
        if transposed { output[[0, a, b]] } else { output[[0, b, a]] }
    };

    let mut candidates = Vec::new();
    for b in 0..num_boxes {
        let objectness = if has_objectness { at(b, 4) } else { 1.0 };
        if objectness < conf_threshold {
            continue;
        }

        let (class_idx, class_score) = (class_offset..attrs)
            .map(|a| (a - class_offset, at(b, a)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        let score = objectness * class_score;
        if score < conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(b, 0), at(b, 1), at(b, 2), at(b, 3));
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
        candidates.push(Candidate {
            class_id: class_idx as u32,
            score,
            corners: [x1, y1, x2, y2],
        });
    }
    Ok(candidates)
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy per-class suppression, highest score first.
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.corners, &candidate.corners) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
