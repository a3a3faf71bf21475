use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::collections::BTreeSet;

use crate::detection::target_boxes;
use crate::models::Detection;

const COVERED: Luma<u8> = Luma([255u8]);

/// Pixels belonging to detected vehicles.
///
/// `Empty` means no qualifying detection existed, which is not the same as
/// a region mask that happens to cover nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleMask {
    Empty,
    Region(GrayImage),
}

impl VehicleMask {
    pub fn is_empty(&self) -> bool {
        matches!(self, VehicleMask::Empty)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        match self {
            VehicleMask::Empty => false,
            VehicleMask::Region(mask) => {
                x < mask.width() && y < mask.height() && mask.get_pixel(x, y)[0] != 0
            }
        }
    }

    /// Number of covered pixels
    pub fn covered(&self) -> usize {
        match self {
            VehicleMask::Empty => 0,
            VehicleMask::Region(mask) => mask.pixels().filter(|p| p[0] != 0).count(),
        }
    }
}

/// Mask plus the vehicle verdict for one image
#[derive(Debug, Clone)]
pub struct MaskOutcome {
    pub mask: VehicleMask,
    pub matched: usize,
}

impl MaskOutcome {
    pub fn has_vehicle(&self) -> bool {
        self.matched > 0
    }
}

/// Union of all usable target-class boxes, filled box by box.
pub fn build_mask(width: u32, height: u32, detections: &[Detection], targets: &BTreeSet<u32>) -> MaskOutcome {
    let mut matched = 0;
    let mut mask: Option<GrayImage> = None;

    for bbox in target_boxes(detections, targets, width, height) {
        matched += 1;
        let canvas = mask.get_or_insert_with(|| GrayImage::new(width, height));
        let rect = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(bbox.width(), bbox.height());
        draw_filled_rect_mut(canvas, rect, COVERED);
    }

    MaskOutcome {
        mask: mask.map_or(VehicleMask::Empty, VehicleMask::Region),
        matched,
    }
}
