//! Per-screenshot pipeline.
//!
//! Orchestrates one detection run: preprocess, detect candidate regions,
//! extract text from each region on a bounded worker pool, parse fields,
//! resolve duplicate detections, classify. Every stage is a pure function of
//! its inputs; the only shared object is the recognizer behind its seam.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::classify;
use crate::detect::{detect_regions, DetectConfig, Region};
use crate::extract::{extract_text, RawTextBlock};
use crate::ocr::Recognizer;
use crate::parse::parse_fields;
use crate::preprocess;
use crate::resolve::resolve_overlaps;
use crate::widget::Widget;
use crate::{ImageView, OwnedImage};

/// All tunables for one extraction run, threaded explicitly from the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub detect: DetectConfig,
    /// Text blocks scoring below this are marked low-confidence.
    pub ocr_confidence_threshold: f32,
    /// Worker pool size for per-region extraction; `None` sizes it to the
    /// available parallelism.
    pub worker_threads: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            detect: DetectConfig::default(),
            ocr_confidence_threshold: 0.30,
            worker_threads: None,
        }
    }
}

/// How the widgets of a screenshot were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Region detection found candidate panels.
    MultiWidgetDetection,
    /// Whole-image fallback (no regions found, or multi-widget disabled).
    SingleWidgetOcr,
}

/// Ordered widgets for one screenshot role; order is detection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSet {
    pub role: String,
    pub method: DetectionMethod,
    pub widgets: Vec<Widget>,
}

/// Run the full extraction pipeline over one screenshot.
///
/// Never fails: detection degradation falls back to whole-image extraction,
/// and an unreadable image yields an empty widget list.
pub fn process_screenshot<R: Recognizer + ?Sized>(
    image: &OwnedImage,
    role: &str,
    recognizer: &R,
    cfg: &ExtractConfig,
    multi_widget: bool,
    extracted_at: &str,
) -> WidgetSet {
    let mut regions = Vec::new();
    if multi_widget {
        let gray = preprocess::prepare_for_detection(image);
        regions = detect_regions(&gray, &cfg.detect);
    }

    let method = if regions.is_empty() {
        // Whole-image fallback: treat the entire screenshot as one widget.
        regions.push(Region::new(0, 0, image.width(), image.height(), 0.5));
        DetectionMethod::SingleWidgetOcr
    } else {
        DetectionMethod::MultiWidgetDetection
    };

    let workers = cfg
        .worker_threads
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    let blocks = extract_all(
        image.as_view(),
        &regions,
        recognizer,
        cfg.ocr_confidence_threshold,
        workers,
    );

    let mut widgets: Vec<Widget> = Vec::new();
    for (region, block) in regions.iter().zip(&blocks) {
        if block.text.trim().is_empty() {
            // Nothing recognizable here; not an error, just no widget.
            continue;
        }
        widgets.push(build_widget(region, block, extracted_at));
    }

    let mut widgets = resolve_overlaps(widgets, cfg.detect.iou_threshold);

    for widget in &mut widgets {
        // A low-confidence block's title is not trusted as a name.
        let title = (!widget.name.is_empty()).then_some(widget.name.as_str());
        let (name, category) = classify::classify_widget(&widget.raw_text, title);
        widget.name = name;
        widget.category = category;
    }

    log::debug!(
        "{role}: {} widget(s) via {:?}",
        widgets.len(),
        method
    );

    WidgetSet {
        role: role.to_string(),
        method,
        widgets,
    }
}

/// Assemble a widget from one region and its text block. Name and category
/// are provisional until classification runs after overlap resolution.
fn build_widget(region: &Region, block: &RawTextBlock, extracted_at: &str) -> Widget {
    let fields = parse_fields(&block.text);
    let title = if block.low_confidence { None } else { fields.title };

    Widget {
        name: title.unwrap_or_default(),
        category: classify::DEFAULT_CATEGORY,
        current_value: fields.current,
        min: fields.min,
        max: fields.max,
        trend: fields.trend,
        status: fields.status,
        spike_time: fields.spike_time,
        raw_text: block.text.clone(),
        confidence: block.confidence,
        source_region: *region,
        extracted_at: extracted_at.to_string(),
    }
}

/// Extract text from every region on a bounded worker pool.
///
/// Results are keyed by region index and reassembled in detection order, so
/// completion order is irrelevant.
fn extract_all<R: Recognizer + ?Sized>(
    image: ImageView<'_>,
    regions: &[Region],
    recognizer: &R,
    confidence_threshold: f32,
    workers: usize,
) -> Vec<RawTextBlock> {
    let n = regions.len();
    if n == 0 {
        return vec![];
    }

    let workers = workers.clamp(1, n);
    if workers == 1 {
        return regions
            .iter()
            .map(|r| extract_text(image, r, recognizer, confidence_threshold))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, RawTextBlock)>();

    std::thread::scope(|s| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            s.spawn(move || loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= n {
                    break;
                }
                let block = extract_text(image, &regions[i], recognizer, confidence_threshold);
                if tx.send((i, block)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut out = vec![RawTextBlock::empty(); n];
    while let Ok((i, block)) = rx.try_recv() {
        out[i] = block;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports the width of whatever crop it is handed, making region
    /// identity observable from the outside.
    struct WidthRecognizer;

    impl Recognizer for WidthRecognizer {
        fn recognize(&self, image: ImageView<'_>) -> String {
            format!("panel {}", image.width())
        }
    }

    struct FixedRecognizer(&'static str);

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _image: ImageView<'_>) -> String {
            self.0.to_string()
        }
    }

    fn uniform_image(width: usize, height: usize) -> OwnedImage {
        OwnedImage::from_rgba(width, &vec![200u8; width * height * 4])
    }

    #[test]
    fn worker_pool_reassembles_results_in_detection_order() {
        let image = uniform_image(700, 100);
        // Distinct widths, full crop height so no upscaling changes them.
        let regions = vec![
            Region::new(0, 0, 100, 100, 0.7),
            Region::new(100, 0, 200, 100, 0.7),
            Region::new(300, 0, 300, 100, 0.7),
        ];

        let blocks = extract_all(image.as_view(), &regions, &WidthRecognizer, 0.30, 3);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text, "panel 100");
        assert_eq!(blocks[1].text, "panel 200");
        assert_eq!(blocks[2].text, "panel 300");
    }

    #[test]
    fn whole_image_fallback_extracts_a_single_widget() {
        // Too small for any region to pass the area filter.
        let image = uniform_image(50, 50);
        let rec = FixedRecognizer("CPU Usage 38.9% Rising 10.0%/95.0%");
        let cfg = ExtractConfig::default();

        let set = process_screenshot(&image, "infrastructure", &rec, &cfg, true, "2026-08-28T00:00:00");

        assert_eq!(set.method, DetectionMethod::SingleWidgetOcr);
        assert_eq!(set.widgets.len(), 1);

        let w = &set.widgets[0];
        assert!(w.name.contains("CPU"));
        assert_eq!(w.category, crate::widget::Category::Infrastructure);
        assert_eq!(w.current_value.unwrap().magnitude, 38.9);
        assert_eq!(w.min, Some(10.0));
        assert_eq!(w.max, Some(95.0));
        assert_eq!(w.trend, crate::widget::Trend::Rising);
    }

    #[test]
    fn empty_recognition_yields_empty_set_not_error() {
        let image = uniform_image(50, 50);
        let rec = FixedRecognizer("");
        let cfg = ExtractConfig::default();

        let set = process_screenshot(&image, "system", &rec, &cfg, true, "2026-08-28T00:00:00");
        assert_eq!(set.method, DetectionMethod::SingleWidgetOcr);
        assert!(set.widgets.is_empty());
    }

    #[test]
    fn multi_widget_disabled_forces_single_widget_path() {
        let image = uniform_image(400, 300);
        let rec = FixedRecognizer("Memory Usage 6.2 GB stable");
        let cfg = ExtractConfig::default();

        let set = process_screenshot(&image, "system", &rec, &cfg, false, "2026-08-28T00:00:00");
        assert_eq!(set.method, DetectionMethod::SingleWidgetOcr);
        assert_eq!(set.widgets.len(), 1);
        assert_eq!(set.widgets[0].name, "Memory Usage");
        assert_eq!(set.widgets[0].category, crate::widget::Category::System);
    }

    #[test]
    fn untitled_text_gets_the_unknown_widget_name() {
        let image = uniform_image(400, 300);
        // Digits only: no line qualifies as a title.
        let rec = FixedRecognizer("1234");
        let cfg = ExtractConfig::default();

        let set = process_screenshot(&image, "system", &rec, &cfg, true, "2026-08-28T00:00:00");
        assert!(!set.widgets.is_empty());
        for w in &set.widgets {
            assert_eq!(w.name, classify::UNKNOWN_WIDGET);
        }
    }

    #[test]
    fn detection_method_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&DetectionMethod::MultiWidgetDetection).unwrap(),
            r#""multi_widget_detection""#
        );
        assert_eq!(
            serde_json::to_string(&DetectionMethod::SingleWidgetOcr).unwrap(),
            r#""single_widget_ocr""#
        );
    }
}
