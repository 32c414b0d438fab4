//! Image preprocessing ahead of OCR.
//!
//! Converts a downloaded table page into a clean binary image:
//! grayscale → upscale → equalize → denoise → sharpen → binarize.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use imageproc::contrast::{adaptive_threshold, equalize_histogram, otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::{filter3x3, median_filter};
use imageproc::morphology::close;

use crate::config::PreprocessParams;

/// 3x3 sharpening convolution kernel.
const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Which filter chain to run.
///
/// `Standard` suits full-page scans; `Table` upscales harder, denoises with a
/// wider median window, and uses an adaptive threshold that copes better with
/// the uneven background of dense table grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    Standard,
    Table,
}

/// Runs the selected filter chain over a decoded page image.
pub fn prepare(img: &DynamicImage, profile: Profile, params: &PreprocessParams) -> GrayImage {
    let gray = img.to_luma8();

    let scale = match profile {
        Profile::Standard => params.scale_factor.max(1),
        Profile::Table => params.scale_factor.max(1) + 1,
    };
    let (w, h) = gray.dimensions();
    let resized = imageops::resize(&gray, w * scale, h * scale, FilterType::CatmullRom);

    let enhanced = equalize_histogram(&resized);

    let radius = match profile {
        Profile::Standard => params.median_radius.max(1),
        Profile::Table => params.median_radius.max(1) + 1,
    };
    let denoised = median_filter(&enhanced, radius, radius);

    let sharpened: GrayImage = filter3x3(&denoised, &SHARPEN_KERNEL);

    match profile {
        Profile::Standard => binarize(&sharpened, params.fixed_threshold),
        Profile::Table => {
            let binary = adaptive_threshold(&sharpened, params.adaptive_block_radius);
            // 2x2-ish close pass to fill pinholes the threshold leaves in strokes
            close(&binary, Norm::LInf, 1)
        }
    }
}

/// Binarizes with a fixed threshold when given one, Otsu's level otherwise.
pub fn binarize(img: &GrayImage, fixed: Option<u8>) -> GrayImage {
    let level = fixed.unwrap_or_else(|| otsu_level(img));
    threshold(img, level, ThresholdType::Binary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let gray = GrayImage::from_fn(width, height, |x, _| {
            Luma([(x * 255 / width.max(1)) as u8])
        });
        DynamicImage::ImageLuma8(gray)
    }

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    #[test]
    fn test_standard_profile_scales_dimensions() {
        let img = gradient_image(20, 10);
        let params = PreprocessParams::default();
        let out = prepare(&img, Profile::Standard, &params);
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn test_table_profile_scales_one_more() {
        let img = gradient_image(20, 10);
        let params = PreprocessParams::default();
        let out = prepare(&img, Profile::Table, &params);
        assert_eq!(out.dimensions(), (60, 30));
    }

    #[test]
    fn test_standard_output_is_binary() {
        let img = gradient_image(32, 16);
        let params = PreprocessParams::default();
        let out = prepare(&img, Profile::Standard, &params);
        assert!(is_binary(&out));
    }

    #[test]
    fn test_table_output_is_binary() {
        let img = gradient_image(32, 16);
        let params = PreprocessParams::default();
        let out = prepare(&img, Profile::Table, &params);
        assert!(is_binary(&out));
    }

    #[test]
    fn test_binarize_fixed_threshold() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([(x as u8) * 80]));
        // Pixels: 0, 80, 160, 240. Threshold 127 keeps the upper two.
        let out = binarize(&img, Some(127));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 0);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
        assert_eq!(out.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_binarize_otsu_separates_modes() {
        // Two clear modes: dark half and bright half
        let img = GrayImage::from_fn(10, 2, |x, _| if x < 5 { Luma([30]) } else { Luma([220]) });
        let out = binarize(&img, None);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn test_zero_scale_factor_clamped() {
        let img = gradient_image(8, 8);
        let params = PreprocessParams {
            scale_factor: 0,
            ..PreprocessParams::default()
        };
        let out = prepare(&img, Profile::Standard, &params);
        assert_eq!(out.dimensions(), (8, 8));
    }
}
