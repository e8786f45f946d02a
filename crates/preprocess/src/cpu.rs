use crate::config::{IMAGENET_MEAN, IMAGENET_STD, INPUT_SIZE, RESIZE_SHORTER_EDGE};
use crate::{ImageTensor, PreprocessError};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::DynamicImage;
use std::path::Path;

/// Decode raw image bytes and run the full pipeline.
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, PreprocessError> {
    let _s = span!("preprocess");

    let image = image::load_from_memory(bytes)?;
    preprocess_image(&image)
}

/// Read an image file and run the full pipeline.
pub fn preprocess_path(path: impl AsRef<Path>) -> Result<ImageTensor, PreprocessError> {
    let bytes = std::fs::read(path)?;
    preprocess(&bytes)
}

/// Convert to RGB, scale the shorter edge to 256, center-crop 224x224 and
/// normalize into a `(1, 3, 224, 224)` tensor.
///
/// Only the source pixels under the crop are resampled, so the work done is
/// the same for any aspect ratio.
pub fn preprocess_image(image: &DynamicImage) -> Result<ImageTensor, PreprocessError> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width == 0 || height == 0 {
        return Err(PreprocessError::Empty { width, height });
    }

    tracing::trace!(width, height, "Preprocessing image");

    let window = crop_window(width, height);
    let cropped = resize_crop(rgb.as_raw(), width, height, window)?;

    normalize(cropped.buffer(), INPUT_SIZE)
}

/// Target size with the shorter edge at `target` and the longer edge scaled
/// proportionally, truncated to whole pixels.
fn shorter_edge_size(width: u32, height: u32, target: u32) -> (u64, u64) {
    let scaled = |long: u32, short: u32| u64::from(target) * u64::from(long) / u64::from(short);

    if width <= height {
        (u64::from(target), scaled(height, width))
    } else {
        (scaled(width, height), u64::from(target))
    }
}

/// Leading offset of a centered crop. Halves are rounded to even.
fn center_offset(length: u64, crop: u32) -> u64 {
    (length.saturating_sub(u64::from(crop)) as f64 / 2.0).round_ties_even() as u64
}

/// Region of the source image, in source pixels, that the shorter-edge
/// resize followed by the center crop would keep.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CropWindow {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

fn crop_window(width: u32, height: u32) -> CropWindow {
    let scale = f64::from(width.min(height)) / f64::from(RESIZE_SHORTER_EDGE);
    let (resized_width, resized_height) = shorter_edge_size(width, height, RESIZE_SHORTER_EDGE);

    let axis = |length: u32, resized: u64| {
        let start = center_offset(resized, INPUT_SIZE) as f64 * scale;
        let extent = (f64::from(INPUT_SIZE) * scale).min(f64::from(length) - start);
        (start, extent)
    };
    let (left, crop_width) = axis(width, resized_width);
    let (top, crop_height) = axis(height, resized_height);

    CropWindow {
        left,
        top,
        width: crop_width,
        height: crop_height,
    }
}

fn resize_crop(
    pixels: &[u8],
    width: u32,
    height: u32,
    window: CropWindow,
) -> Result<Image<'static>, PreprocessError> {
    let _s = span!("resize_center_crop");

    let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;
    let mut cropped = Image::new(INPUT_SIZE, INPUT_SIZE, PixelType::U8x3);

    Resizer::new().resize(
        &src,
        &mut cropped,
        &ResizeOptions::new()
            .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
            .crop(window.left, window.top, window.width, window.height),
    )?;

    Ok(cropped)
}

fn normalize(buf: &[u8], size: u32) -> Result<ImageTensor, PreprocessError> {
    let _s = span!("normalize");

    let size = size as usize;
    let spatial = size * size;
    let mut output = vec![0.0f32; 3 * spatial];

    for (i, px) in buf.chunks_exact(3).take(spatial).enumerate() {
        for c in 0..3 {
            let value = f32::from(px[c]) / 255.0;
            output[c * spatial + i] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Ok(ImageTensor::from_shape_vec((1, 3, size, size), output)?)
}
