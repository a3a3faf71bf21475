use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::error::DecodeError;

/// Metadata of a decoded image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

impl ImageRecord {
    pub fn from_image(path: &Path, image: &DynamicImage) -> Result<Self, DecodeError> {
        let size_bytes = std::fs::metadata(path)
            .map_err(|e| DecodeError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            size_bytes,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// e.g. "1920x1080"
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1_048_576.0
    }
}

/// Pixel-space box, `x1 < x2 <= width`, `y1 < y2 <= height`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Clamp float corners into the image; `None` if nothing is left.
    pub fn clamped(x1: f32, y1: f32, x2: f32, y2: f32, width: u32, height: u32) -> Option<Self> {
        let clamp = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
        let bbox = Self {
            x1: clamp(x1, width),
            y1: clamp(y1, height),
            x2: clamp(x2, width),
            y2: clamp(y2, height),
        };
        (bbox.x1 < bbox.x2 && bbox.y1 < bbox.y2).then_some(bbox)
    }

    /// Clip to a `width`x`height` image; `None` if nothing is left.
    pub fn clipped(&self, width: u32, height: u32) -> Option<Self> {
        let bbox = Self {
            x2: self.x2.min(width),
            y2: self.y2.min(height),
            ..*self
        };
        (bbox.x1 < bbox.x2 && bbox.y1 < bbox.y2).then_some(bbox)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// A single labeled object proposal
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Color space a centroid was computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// 8-bit HSV: hue in 0..180, saturation and value in 0..=255
    Hsv,
    Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorCluster {
    /// Rounded and clamped to 0..=255
    pub centroid: [u8; 3],
    pub space: ColorSpace,
    pub member_count: usize,
}

impl ColorCluster {
    /// Centroid as display RGB
    pub fn to_rgb(&self) -> [u8; 3] {
        match self.space {
            ColorSpace::Rgb => self.centroid,
            ColorSpace::Hsv => crate::color::hsv::hsv_to_rgb(self.centroid),
        }
    }

    pub fn hex(&self) -> String {
        let [r, g, b] = self.to_rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Per-image outcome written once to the result sink
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub file_name: String,
    pub has_vehicle: bool,
    pub clusters: Vec<ColorCluster>,
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub file_name: String,
    pub has_vehicle: bool,
}

/// Ordered ledger mirroring file enumeration order
pub type BatchSummary = Vec<SummaryRow>;
