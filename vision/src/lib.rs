//! Dashboard screenshot vision pipeline.
//!
//! Everything needed to turn a raw screenshot into typed widgets: image
//! buffers, region detection, OCR-backed text extraction, field parsing,
//! overlap resolution and classification. The crate is deterministic for a
//! given recognizer; the OCR engine sits behind the [`ocr::Recognizer`] seam
//! so callers (and tests) can substitute their own.

mod image;

pub mod classify;
pub mod detect;
pub mod extract;
pub mod ocr;
pub mod parse;
pub mod pipeline;
pub mod preprocess;
pub mod resolve;
pub mod widget;

pub use image::{Color, ImageView, OwnedImage};
pub use pipeline::{process_screenshot, DetectionMethod, ExtractConfig, WidgetSet};
pub use widget::{Category, Measurement, Status, Trend, Unit, Widget};
