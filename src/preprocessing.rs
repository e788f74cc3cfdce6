// flora-inference 🚀 AGPL-3.0 License

//! Image preprocessing for the classification forward pass.
//!
//! The transform mirrors the pipeline the bundle was trained with: resize the
//! shortest side to 255 px, center crop 224x224, scale to [0, 1], then
//! normalize each channel with the ImageNet statistics.

use fast_image_resize::{images::Image, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

use crate::error::{ClassifyError, Result};

/// Shortest-side length after the initial resize.
pub const RESIZE_SHORTEST: u32 = 255;

/// Side length of the square center crop fed to the model.
pub const CROP_SIZE: u32 = 224;

/// ImageNet normalization mean values (RGB).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values (RGB).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Result of preprocessing an image.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Normalized image tensor in NCHW format, shape (1, 3, 224, 224).
    pub tensor: Array4<f32>,
    /// Original image dimensions (height, width).
    pub orig_shape: (u32, u32),
}

/// Preprocess an image for classification.
///
/// # Errors
///
/// Returns an error if the resize or crop cannot be performed (e.g. a
/// zero-sized input image).
pub fn preprocess_image(image: &DynamicImage) -> Result<PreprocessResult> {
    let (orig_width, orig_height) = image.dimensions();
    let orig_shape = (orig_height, orig_width);

    let cropped = resize_and_center_crop(image)?;
    let tensor = image_to_tensor(&cropped);

    Ok(PreprocessResult { tensor, orig_shape })
}

/// Resize the shortest side to [`RESIZE_SHORTEST`], then crop the center
/// [`CROP_SIZE`] square.
fn resize_and_center_crop(image: &DynamicImage) -> Result<RgbImage> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(ClassifyError::ImageError(
            "Input image has zero dimensions".to_string(),
        ));
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = RESIZE_SHORTEST as f32 / src_w.min(src_h) as f32;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let new_w = ((src_w as f32 * scale).round() as u32).max(CROP_SIZE);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let new_h = ((src_h as f32 * scale).round() as u32).max(CROP_SIZE);

    let src_rgb = image.to_rgb8();
    let src_image = Image::from_vec_u8(src_w, src_h, src_rgb.into_raw(), PixelType::U8x3)
        .map_err(|e| ClassifyError::ImageError(format!("Failed to create source image: {e}")))?;

    let mut dst_image = Image::new(new_w, new_h, PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ClassifyError::ImageError(format!("Failed to resize image: {e}")))?;

    let resized_rgb = RgbImage::from_raw(new_w, new_h, dst_image.into_vec()).ok_or_else(|| {
        ClassifyError::ImageError("Failed to create resized buffer".to_string())
    })?;

    // Crop offsets use half-to-even rounding to match the exporter's pipeline.
    #[allow(clippy::cast_precision_loss)]
    let crop_x_float = new_w.saturating_sub(CROP_SIZE) as f32 / 2.0;
    #[allow(clippy::cast_precision_loss)]
    let crop_y_float = new_h.saturating_sub(CROP_SIZE) as f32 / 2.0;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let crop_x = bankers_round(crop_x_float) as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let crop_y = bankers_round(crop_y_float) as u32;

    Ok(image::imageops::crop_imm(&resized_rgb, crop_x, crop_y, CROP_SIZE, CROP_SIZE).to_image())
}

/// Convert a cropped RGB image to a normalized NCHW tensor.
///
/// Scales pixel values to [0, 1] and applies the per-channel ImageNet
/// mean/std normalization.
fn image_to_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let pixels = image.as_raw();

    let mut tensor = Array4::zeros((1, 3, h, w));

    let slice = tensor
        .as_slice_mut()
        .expect("freshly allocated tensor is contiguous");
    let (r_slice, rest) = slice.split_at_mut(h * w);
    let (g_slice, b_slice) = rest.split_at_mut(h * w);

    for (i, chunk) in pixels.chunks_exact(3).enumerate() {
        r_slice[i] = (f32::from(chunk[0]) / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        g_slice[i] = (f32::from(chunk[1]) / 255.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        b_slice[i] = (f32::from(chunk[2]) / 255.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];
    }

    tensor
}

/// Round float to nearest integer, rounding half to even (Banker's Rounding).
fn bankers_round(v: f32) -> f32 {
    let n = v.floor();
    let d = v - n;
    if (d - 0.5).abs() < 1e-6 {
        if n % 2.0 == 0.0 {
            n
        } else {
            n + 1.0
        }
    } else {
        v.round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape() {
        let img = DynamicImage::new_rgb8(500, 375);
        let result = preprocess_image(&img).unwrap();
        assert_eq!(
            result.tensor.shape(),
            &[1, 3, CROP_SIZE as usize, CROP_SIZE as usize]
        );
        assert_eq!(result.orig_shape, (375, 500));
    }

    #[test]
    fn test_preprocess_portrait_and_small_inputs() {
        // Portrait orientation
        let img = DynamicImage::new_rgb8(300, 600);
        let result = preprocess_image(&img).unwrap();
        assert_eq!(result.tensor.shape()[2], CROP_SIZE as usize);

        // Smaller than the crop on both sides still upsamples to a full crop
        let img = DynamicImage::new_rgb8(60, 40);
        let result = preprocess_image(&img).unwrap();
        assert_eq!(result.tensor.shape()[3], CROP_SIZE as usize);
    }

    #[test]
    fn test_normalization_values() {
        // A uniform mid-gray image: every channel value is (0.5 - mean) / std.
        let mut rgb = RgbImage::new(400, 400);
        for pixel in rgb.pixels_mut() {
            *pixel = image::Rgb([128, 128, 128]);
        }
        let img = DynamicImage::ImageRgb8(rgb);
        let result = preprocess_image(&img).unwrap();

        let expected_r = (128.0 / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let got = result.tensor[[0, 0, 100, 100]];
        assert!((got - expected_r).abs() < 1e-4);
    }

    #[test]
    fn test_black_image_normalization() {
        let img = DynamicImage::new_rgb8(300, 300);
        let result = preprocess_image(&img).unwrap();
        let expected_b = (0.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];
        assert!((result.tensor[[0, 2, 0, 0]] - expected_b).abs() < 1e-5);
    }

    #[test]
    fn test_bankers_round() {
        assert!((bankers_round(0.5) - 0.0).abs() < f32::EPSILON);
        assert!((bankers_round(1.5) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(2.5) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(2.4) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(2.6) - 3.0).abs() < f32::EPSILON);
    }
}
