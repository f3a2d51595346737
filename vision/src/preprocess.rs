//! Image preprocessing for text recognition.
//!
//! Dashboard widgets mix light-on-dark and dark-on-light themes, gradients,
//! and tiny fonts. No single binarization wins everywhere, so the extractor
//! recognizes several candidates and keeps the most plausible result.

use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, equalize_histogram, otsu_level, threshold, ThresholdType};
use imageproc::filter::median_filter;

use crate::OwnedImage;

/// Grayscale + equalization + light denoising, shared by the detection passes.
pub fn prepare_for_detection(image: &OwnedImage) -> GrayImage {
    let gray = equalize_histogram(&image.to_gray_image());
    median_filter(&gray, 1, 1)
}

/// Binarization candidates for one OCR crop, best-effort in preference order.
pub fn binarize_candidates(crop: &OwnedImage) -> Vec<OwnedImage> {
    // Candidate 1: adaptive threshold (handles gradients and sparklines).
    let adaptive = {
        let gray = equalize_histogram(&crop.to_gray_image());
        let bin = adaptive_threshold(&gray, 7, 10);
        OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(bin))
    };

    // Candidate 2: global Otsu.
    let otsu = {
        let gray = equalize_histogram(&crop.to_gray_image());
        let level = otsu_level(&gray);
        let bin = threshold(&gray, level, ThresholdType::Binary);
        OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(bin))
    };

    vec![adaptive, otsu]
}

/// If the binary image is mostly black, invert it so the background is light.
/// Recognition models expect dark glyphs on a light background.
pub fn ensure_dark_text_on_light(mut bin: GrayImage) -> GrayImage {
    let mut white = 0u64;
    let mut black = 0u64;
    for p in bin.pixels() {
        if p.0[0] > 0 {
            white += 1;
        } else {
            black += 1;
        }
    }
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
    bin
}
