//! Image preprocessing for the CNN input tensor
//!
//! Resize to a square, force RGB, scale to `[0, 1]` and lay the pixels out
//! channel-first (C, H, W). The batch dimension is added by the caller.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use crate::errors::{DetectionError, Result};

/// Number of color channels the model expects
pub const CHANNELS: usize = 3;

/// Decode encoded image bytes (PNG, JPEG, ...)
pub fn decode(name: &str, bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| DetectionError::input(name, e))
}

/// Resize to `size` x `size` RGB
pub fn resize_rgb(image: &DynamicImage, size: u32) -> RgbImage {
    let rgb = image.to_rgb8();
    imageops::resize(&rgb, size, size, FilterType::CatmullRom)
}

/// Channel-first float pixels for a `size` x `size` model input
pub fn to_chw(image: &DynamicImage, size: u32) -> Vec<f32> {
    let resized = resize_rgb(image, size);
    let side = size as usize;
    let plane = side * side;

    let mut data = vec![0f32; CHANNELS * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * side + x as usize;
        for c in 0..CHANNELS {
            data[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }
    data
}
