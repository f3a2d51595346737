//! OCR wrapper.
//!
//! The pipeline relies on `ocr-rs` (Rust PaddleOCR bindings) behind the
//! [`Recognizer`] seam so tests and alternative engines can substitute a
//! fake. OCR engines are sensitive to input quality, so preprocessing
//! happens in [`crate::extract`] before calling into this module.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};

use crate::ImageView;

/// Engine identifier reported on the health surface.
pub const ENGINE_NAME: &str = "PaddleOCR (ocr-rs)";

/// Text recognition seam. Implementations must be callable concurrently
/// across independent regions.
pub trait Recognizer: Send + Sync {
    /// Recognize text from an RGB image view. Recognition failures surface
    /// as an empty string, never an error; the extractor scores the output.
    fn recognize(&self, image: ImageView<'_>) -> String;
}

pub struct Ocr {
    // The MNN session is not shareable across threads; region extraction
    // workers serialize on this lock while the engine parallelizes
    // internally across detected text lines.
    engine: Mutex<ocr_rs::OcrEngine>,
}

impl Ocr {
    /// Initialize the OCR engine with the given model paths.
    pub fn try_new(
        detection: impl AsRef<Path>,
        recognition: impl AsRef<Path>,
        charsset: impl AsRef<Path>,
    ) -> Result<Self> {
        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection,
            recognition,
            charsset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count,
                // Accuracy-focused: dashboard crops carry small digits where
                // High precision pays for its CPU cost.
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .context("failed to initialize OCR engine")?;

        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl Recognizer for Ocr {
    fn recognize(&self, image: ImageView<'_>) -> String {
        let image = ocr_rs::preprocess::rgb_to_image(&image.get_bytes(), image.width(), image.height());

        let Ok(engine) = self.engine.lock() else {
            return String::new();
        };

        match engine.recognize(&image) {
            Ok(results) => results
                .into_iter()
                .map(|v| v.text)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }
}
