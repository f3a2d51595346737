//! Per-region text extraction.
//!
//! Crops one region out of the screenshot, tries each binarization candidate
//! through the recognizer, and keeps the most plausible text. The result is
//! never dropped for being bad; low-confidence blocks carry a marker that
//! downstream stages use to prefer other signals.

use crate::detect::Region;
use crate::ocr::Recognizer;
use crate::{preprocess, ImageView};

// OCR generally performs better on larger glyphs; upscale small crops.
const MIN_CROP_HEIGHT: u32 = 80;

/// Recognized text for exactly one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTextBlock {
    pub text: String,
    /// Plausibility score in [0,1]. The local engine exposes no per-word
    /// confidences, so this is derived from the shape of the output text.
    pub confidence: f32,
    /// Set when `confidence` fell below the configured threshold. The block
    /// is still returned; downstream stages default to `Unknown` fields.
    pub low_confidence: bool,
}

impl RawTextBlock {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            low_confidence: true,
        }
    }
}

/// Extract text from one region of the screenshot.
///
/// Pure with respect to `image`; safe to call concurrently across regions.
pub fn extract_text<R: Recognizer + ?Sized>(
    image: ImageView<'_>,
    region: &Region,
    recognizer: &R,
    confidence_threshold: f32,
) -> RawTextBlock {
    let crop = image.sub_image(region.x, region.y, region.width, region.height);
    if crop.width() == 0 || crop.height() == 0 {
        return RawTextBlock::empty();
    }

    let mut base = crop.to_owned_image();
    if base.height() < MIN_CROP_HEIGHT {
        base = base.resized_h(MIN_CROP_HEIGHT);
    }

    let mut best = String::new();
    let mut best_score = f32::MIN;

    for cand in preprocess::binarize_candidates(&base) {
        let text = recognizer.recognize(cand.as_view());
        let score = text_plausibility(&text);
        if score > best_score {
            best_score = score;
            best = text;
        }
    }

    let confidence = text_plausibility(&best);
    RawTextBlock {
        low_confidence: confidence < confidence_threshold,
        text: best,
        confidence,
    }
}

/// Score recognized text in [0,1]: clean alphanumeric output scores high,
/// empty or symbol soup scores low.
pub fn text_plausibility(text: &str) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let mut alnum = 0u32;
    let mut other = 0u32;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            alnum += 1;
        } else {
            other += 1;
        }
    }

    let total = (alnum + other).max(1) as f32;
    let alnum_frac = alnum as f32 / total;
    let length_factor = (trimmed.len().min(24) as f32) / 24.0;

    alnum_frac * 0.8 + length_factor * 0.2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OwnedImage;

    struct FixedRecognizer(&'static str);

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _image: ImageView<'_>) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn plausibility_ordering() {
        assert_eq!(text_plausibility(""), 0.0);
        assert_eq!(text_plausibility("   "), 0.0);
        assert!(text_plausibility("CPU Usage 38.9%") > text_plausibility("#$%@!"));
        assert!(text_plausibility("Memory Usage 6.2 GB") > 0.5);
    }

    #[test]
    fn low_confidence_blocks_are_returned_not_dropped() {
        let img = OwnedImage::from_rgba(100, &[180u8; 100 * 100 * 4]);
        let region = Region::new(0, 0, 100, 100, 0.7);
        let rec = FixedRecognizer("@@");

        let block = extract_text(img.as_view(), &region, &rec, 0.30);
        assert_eq!(block.text, "@@");
        assert!(block.low_confidence);
    }

    #[test]
    fn confident_text_clears_threshold() {
        let img = OwnedImage::from_rgba(100, &[180u8; 100 * 100 * 4]);
        let region = Region::new(10, 10, 80, 40, 0.7);
        let rec = FixedRecognizer("CPU Usage 38.9% Rising");

        let block = extract_text(img.as_view(), &region, &rec, 0.30);
        assert!(!block.low_confidence);
        assert!(block.confidence > 0.5);
    }

    #[test]
    fn degenerate_region_yields_empty_block() {
        let img = OwnedImage::from_rgba(10, &[0u8; 10 * 10 * 4]);
        let region = Region::new(10, 10, 0, 0, 0.7);
        let rec = FixedRecognizer("never called");

        let block = extract_text(img.as_view(), &region, &rec, 0.30);
        assert_eq!(block, RawTextBlock::empty());
    }
}
