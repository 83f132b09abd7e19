use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::ProcessingError;

/// Largest output buffer a resize may allocate, in pixels.
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Height that keeps the aspect ratio of a `width`×`height` image scaled to
/// `target_width`. Never zero.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    let aspect_ratio = height as f64 / width as f64;
    // `as` saturates at u32::MAX
    ((target_width as f64 * aspect_ratio).round() as u32).max(1)
}

/// Scale `img` so its width is `target_width`, height following the aspect
/// ratio. Catmull-Rom is the bicubic kernel in `image`. Returns a new buffer,
/// or `OutputTooLarge` when it would exceed [`MAX_OUTPUT_PIXELS`].
pub fn resize_to_width(
    img: &DynamicImage,
    target_width: u32,
) -> Result<DynamicImage, ProcessingError> {
    let (current_width, current_height) = img.dimensions();
    let target_width = target_width.max(1);
    let target_height = scaled_height(current_width, current_height, target_width);

    if target_width as u64 * target_height as u64 > MAX_OUTPUT_PIXELS {
        return Err(ProcessingError::OutputTooLarge {
            width: target_width,
            height: target_height,
        });
    }

    Ok(img.resize_exact(target_width, target_height, FilterType::CatmullRom))
}
