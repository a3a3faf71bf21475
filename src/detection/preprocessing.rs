use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use rten_tensor::NdTensor;

/// Gray used by YOLO letterboxing
const PAD_VALUE: u8 = 114;

/// Square model input plus the transform back to source pixels
pub struct Letterbox {
    /// NCHW, values in 0..=1
    pub tensor: NdTensor<f32, 4>,
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Map a point in model input space back to the source image
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Resize keeping aspect ratio, center on a padded square canvas.
pub fn letterbox(img: &DynamicImage, target_size: u32) -> Letterbox {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let scale = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
    let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, target_size);
    let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, target_size);
    let scaled = imageops::resize(&rgb, scaled_w, scaled_h, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_VALUE; 3]));
    let offset_x = (target_size - scaled_w) / 2;
    let offset_y = (target_size - scaled_h) / 2;
    imageops::overlay(&mut canvas, &scaled, offset_x.into(), offset_y.into());

    Letterbox {
        tensor: to_nchw(&canvas),
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
    }
}

fn to_nchw(img: &RgbImage) -> NdTensor<f32, 4> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in img.enumerate_pixels() {
        let idx = (y * width + x) as usize;
        for c in 0..3 {
            data[c * plane + idx] = pixel[c] as f32 / 255.0;
        }
    }
    NdTensor::from_data([1, 3, height as usize, width as usize], data)
}
