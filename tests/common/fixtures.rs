#![allow(dead_code)]

use carcolors::detection::coco;
use carcolors::{BoundingBox, Detection, InferenceError, Pipeline, PipelineConfig, ProgressEvent, VehicleDetector};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const GRAY: [u8; 3] = [128, 128, 128];
pub const RED: [u8; 3] = [220, 20, 20];
pub const BLUE: [u8; 3] = [20, 40, 210];
pub const GREEN: [u8; 3] = [30, 200, 40];
pub const BLACK: [u8; 3] = [5, 5, 5];
/// Marker color the fake detector reports as a person
pub const PERSON_MARK: [u8; 3] = [250, 200, 0];

/// Solid-color image
pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// `background` image with a filled `color` rectangle `[x1, x2) x [y1, y2)`
pub fn with_rect(width: u32, height: u32, background: [u8; 3], rect: (u32, u32, u32, u32), color: [u8; 3]) -> RgbImage {
    let (x1, y1, x2, y2) = rect;
    RgbImage::from_fn(width, height, |x, y| {
        if x >= x1 && x < x2 && y >= y1 && y < y2 {
            Rgb(color)
        } else {
            Rgb(background)
        }
    })
}

/// Vertical stripes of equal width, one per color
pub fn stripes(width: u32, height: u32, colors: &[[u8; 3]]) -> RgbImage {
    let stripe = width / colors.len() as u32;
    RgbImage::from_fn(width, height, |x, _| {
        Rgb(colors[((x / stripe) as usize).min(colors.len() - 1)])
    })
}

/// Save `img` as PNG into `dir` and return its path
pub fn write_image(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

pub fn bbox(x1: u32, y1: u32, x2: u32, y2: u32) -> BoundingBox {
    BoundingBox { x1, y1, x2, y2 }
}

pub fn detection(class_id: u32, bbox: BoundingBox) -> Detection {
    Detection {
        class_id,
        bbox,
        confidence: 0.9,
    }
}

/// Fake detector: reports the bounding box of every marker color present.
pub struct MarkerDetector {
    markers: Vec<([u8; 3], u32)>,
}

impl MarkerDetector {
    /// RED is a car, BLUE a truck, PERSON_MARK a person
    pub fn standard() -> Self {
        Self {
            markers: vec![
                (RED, coco::CAR),
                (BLUE, coco::TRUCK),
                (PERSON_MARK, 0),
            ],
        }
    }
}

impl VehicleDetector for MarkerDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        let rgb = image.to_rgb8();
        let mut found = Vec::new();
        for (marker, class_id) in &self.markers {
            let mut bounds: Option<(u32, u32, u32, u32)> = None;
            for (x, y, pixel) in rgb.enumerate_pixels() {
                if pixel.0 == *marker {
                    let b = bounds.get_or_insert((x, y, x, y));
                    b.0 = b.0.min(x);
                    b.1 = b.1.min(y);
                    b.2 = b.2.max(x);
                    b.3 = b.3.max(y);
                }
            }
            if let Some((x1, y1, x2, y2)) = bounds {
                found.push(detection(*class_id, bbox(x1, y1, x2 + 1, y2 + 1)));
            }
        }
        Ok(found)
    }

    fn name(&self) -> &str {
        "marker"
    }
}

/// Returns the same detections for every image
pub struct FixedDetector(pub Vec<Detection>);

impl VehicleDetector for FixedDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Always fails
pub struct FailingDetector;

impl VehicleDetector for FailingDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        Err(InferenceError::InvalidShape {
            width: image.width(),
            height: image.height(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Counts how many detector calls were made
pub struct CountingDetector {
    inner: MarkerDetector,
    pub batch_calls: Mutex<Vec<usize>>,
}

impl CountingDetector {
    pub fn new() -> Self {
        Self {
            inner: MarkerDetector::standard(),
            batch_calls: Mutex::new(Vec::new()),
        }
    }
}

impl VehicleDetector for CountingDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        self.inner.detect(image)
    }

    fn detect_batch(&self, images: &[&DynamicImage]) -> Vec<Result<Vec<Detection>, InferenceError>> {
        self.batch_calls.lock().unwrap().push(images.len());
        images.iter().map(|image| self.inner.detect(image)).collect()
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Workspace with `input/`, and config pointing output and ledger into it.
pub struct BatchFixture {
    pub dir: TempDir,
    pub input: PathBuf,
    pub config: PipelineConfig,
}

impl BatchFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let input = dir.path().join("input");
        std::fs::create_dir_all(&input).expect("Failed to create input directory");
        let config = PipelineConfig {
            output_dir: dir.path().join("cars"),
            summary_path: dir.path().join("output.csv"),
            seed: Some(42),
            ..PipelineConfig::default()
        };
        Self { dir, input, config }
    }

    pub fn add(&self, name: &str, img: &RgbImage) -> PathBuf {
        write_image(&self.input, name, img)
    }

    pub fn pipeline(&self, detector: impl VehicleDetector + 'static) -> Pipeline {
        Pipeline::new(Arc::new(detector), self.config.clone()).expect("valid config")
    }

    pub fn summary_text(&self) -> String {
        std::fs::read_to_string(&self.config.summary_path).expect("summary exists")
    }

    pub fn copied(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.config.output_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Progress sink that remembers every event
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn fractions(&self) -> Vec<f32> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Advanced { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

impl carcolors::ProgressSink for RecordingProgress {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
