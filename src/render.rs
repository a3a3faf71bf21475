use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::collections::BTreeSet;

use crate::detection::target_boxes;
use crate::models::{ColorCluster, Detection};

const BOX_COLOR: Rgb<u8> = Rgb([255, 56, 56]);
const BOX_THICKNESS: i32 = 3;

/// Copy of `image` with every usable target-class box outlined.
pub fn annotate(image: &DynamicImage, detections: &[Detection], targets: &BTreeSet<u32>) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();
    for bbox in target_boxes(detections, targets, width, height) {
        for inset in 0..BOX_THICKNESS {
            let w = bbox.width() as i32 - 2 * inset;
            let h = bbox.height() as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(bbox.x1 as i32 + inset, bbox.y1 as i32 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        }
    }
    canvas
}

/// One `swatch`-sized square per cluster, left to right, in display RGB.
pub fn palette(clusters: &[ColorCluster], swatch: u32) -> RgbImage {
    let swatch = swatch.max(1);
    let width = swatch * clusters.len().max(1) as u32;
    RgbImage::from_fn(width, swatch, |x, _| {
        clusters
            .get((x / swatch) as usize)
            .map(|c| Rgb(c.to_rgb()))
            .unwrap_or(Rgb([255, 255, 255]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, ColorSpace};

    #[test]
    fn annotate_outlines_target_boxes_only() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([0, 0, 0])));
        let detections = vec![
            Detection {
                class_id: 2,
                bbox: BoundingBox { x1: 2, y1: 2, x2: 12, y2: 12 },
                confidence: 0.8,
            },
            Detection {
                class_id: 0,
                bbox: BoundingBox { x1: 14, y1: 14, x2: 20, y2: 20 },
                confidence: 0.8,
            },
        ];
        let targets: BTreeSet<u32> = [2].into_iter().collect();

        let out = annotate(&image, &detections, &targets);

        assert_eq!(*out.get_pixel(2, 2), BOX_COLOR);
        assert_eq!(*out.get_pixel(7, 7), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(14, 14), Rgb([0, 0, 0]));
    }

    #[test]
    fn palette_has_one_swatch_per_cluster() {
        let clusters = vec![
            ColorCluster { centroid: [255, 0, 0], space: ColorSpace::Rgb, member_count: 5 },
            ColorCluster { centroid: [0, 0, 255], space: ColorSpace::Rgb, member_count: 2 },
        ];

        let strip = palette(&clusters, 10);

        assert_eq!(strip.dimensions(), (20, 10));
        assert_eq!(*strip.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*strip.get_pixel(19, 9), Rgb([0, 0, 255]));
    }
}
