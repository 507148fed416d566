//! Visual vectorizer: coarse color/layout fingerprint of an image.
//!
//! The image is downsampled to a small fixed square and its RGB bytes are
//! flattened into an f32 vector. The resize is informationally lossy by
//! design; only coarse color and layout signal is wanted, and the fixed
//! resolution is what makes the fused-vector length independent of input
//! image size.

use image::DynamicImage;
use image::imageops::FilterType;

/// Flatten `image` into a `3 * resolution^2` vector of raw channel values.
#[must_use]
pub fn visual_vector(image: &DynamicImage, resolution: u32) -> Vec<f32> {
    let resized = image.resize_exact(resolution, resolution, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    rgb.as_raw().iter().map(|&byte| byte as f32).collect()
}

/// Expected visual vector length for a given resolution.
#[must_use]
pub const fn visual_dimension(resolution: u32) -> usize {
    3 * (resolution as usize) * (resolution as usize)
}
