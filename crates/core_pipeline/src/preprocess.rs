//! Image preprocessing module
//!
//! Cleans small, noisy digit images before recognition:
//! - Grayscale conversion (ITU-R 601-2 luma)
//! - 3x3 median filter against dotted (salt and pepper) noise
//! - Auto-contrast (per-image min/max stretch)
//! - Sharpening to undo the median blur
//!
//! The steps run in that fixed order and the whole transform is pure.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::median_filter;

/// ITU-R 601-2 luma weights in 16.16 fixed point; they sum to 1 << 16
const LUMA_R: u32 = 19595;
const LUMA_G: u32 = 38470;
const LUMA_B: u32 = 7471;

/// 3x3 sharpen kernel, row-major; weights sum to `SHARPEN_SCALE`
const SHARPEN_KERNEL: [i32; 9] = [-2, -2, -2, -2, 32, -2, -2, -2, -2];
const SHARPEN_SCALE: i32 = 16;

/// Preprocess a decoded image for digit recognition
pub fn preprocess_image(input: &DynamicImage) -> GrayImage {
    let gray = to_luma_601(input);

    // Radius 1 in both directions is a 3x3 window; edges are clamped
    let denoised = median_filter(&gray, 1, 1);

    let stretched = autocontrast(&denoised);
    sharpen(&stretched)
}

/// Convert to grayscale with `L = R * 299/1000 + G * 587/1000 + B * 114/1000`
///
/// Alpha is ignored. Gray inputs come back with the same values.
pub fn to_luma_601(input: &DynamicImage) -> GrayImage {
    let rgb = input.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let weighted = u32::from(r) * LUMA_R + u32::from(g) * LUMA_G + u32::from(b) * LUMA_B;
        Luma([((weighted + 0x8000) >> 16) as u8])
    })
}

/// Linearly stretch intensities so the darkest pixel becomes 0 and the
/// lightest becomes 255
///
/// Uniform images are returned unchanged.
pub fn autocontrast(input: &GrayImage) -> GrayImage {
    let Some((lo, hi)) = intensity_range(input) else {
        return input.clone();
    };
    if hi <= lo {
        return input.clone();
    }

    let span = u32::from(hi - lo);
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let value = (value as u32).clamp(u32::from(lo), u32::from(hi));
        *slot = ((value - u32::from(lo)) * 255 / span) as u8;
    }

    let mut output = input.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
    output
}

/// Apply the fixed 3x3 sharpen kernel
///
/// Border rows and columns are copied through unchanged since the kernel
/// does not fit there; images narrower or shorter than 3 pixels come back
/// as-is.
pub fn sharpen(input: &GrayImage) -> GrayImage {
    let (width, height) = input.dimensions();
    let mut output = input.clone();
    if width < 3 || height < 3 {
        return output;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = 0i32;
            for (i, weight) in SHARPEN_KERNEL.iter().enumerate() {
                let nx = x + (i % 3) as u32 - 1;
                let ny = y + (i / 3) as u32 - 1;
                acc += weight * i32::from(input.get_pixel(nx, ny)[0]);
            }
            let value = (acc + SHARPEN_SCALE / 2)
                .div_euclid(SHARPEN_SCALE)
                .clamp(0, 255);
            output.put_pixel(x, y, Luma([value as u8]));
        }
    }

    output
}

fn intensity_range(input: &GrayImage) -> Option<(u8, u8)> {
    input.pixels().fold(None, |range, pixel| {
        let v = pixel[0];
        Some(match range {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        })
    })
}
