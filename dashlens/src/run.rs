//! One analysis run: decode, extract, summarize, analyze, persist.
//!
//! Input validation is the only hard-failure surface. Everything past it
//! degrades: a failed model call records its reason, a failed report save
//! still returns the in-line analysis.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use analysis::{Issue, LanguageModel, ReportMeta, ReportStore};
use vision::ocr::Recognizer;
use vision::{process_screenshot, ExtractConfig, OwnedImage, Widget, WidgetSet};

pub const ROLE_INFRASTRUCTURE: &str = "infrastructure";
pub const ROLE_SYSTEM: &str = "system";

/// One inbound request: two screenshots plus toggles.
pub struct Request<'a> {
    pub infrastructure_image: &'a [u8],
    pub system_image: &'a [u8],
    /// `YYYY-MM-DD`; defaults to today.
    pub date: Option<&'a str>,
    pub enable_analysis: bool,
    pub multi_widget: bool,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_widgets: usize,
    pub widgets_with_trends: usize,
    pub widgets_with_spikes: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalysisBlock {
    pub summary: String,
    pub performance_score: Option<f64>,
    pub issues: Vec<Issue>,
    pub immediate_actions: Vec<String>,
    pub short_term_actions: Vec<String>,
    pub long_term_actions: Vec<String>,
    /// Set when the rendered report was persisted.
    pub report_file: Option<String>,
    pub model_used: String,
    pub tokens_used: u32,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    pub date: String,
    pub screenshots: Vec<WidgetSet>,
    pub summary: Summary,
    /// Filename of the persisted widget-table CSV, when one was written.
    pub export_file: Option<String>,
    pub analysis: Option<AnalysisBlock>,
    /// Why `analysis` is absent, when it was requested.
    pub analysis_error: Option<String>,
}

/// Process one request end to end.
pub fn run(
    cfg: &ExtractConfig,
    recognizer: &dyn Recognizer,
    model: Option<&dyn LanguageModel>,
    store: &ReportStore,
    req: &Request<'_>,
) -> Result<Response> {
    let date = match req.date {
        Some(raw) => {
            let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))?;
            parsed.to_string()
        }
        None => Local::now().date_naive().to_string(),
    };

    let infra = OwnedImage::decode(req.infrastructure_image)
        .context("decode infrastructure screenshot")?;
    let system = OwnedImage::decode(req.system_image).context("decode system screenshot")?;

    let extracted_at = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

    let screenshots = vec![
        process_screenshot(&infra, ROLE_INFRASTRUCTURE, recognizer, cfg, req.multi_widget, &extracted_at),
        process_screenshot(&system, ROLE_SYSTEM, recognizer, cfg, req.multi_widget, &extracted_at),
    ];

    let widgets: Vec<Widget> = screenshots
        .iter()
        .flat_map(|s| s.widgets.iter().cloned())
        .collect();
    let summary = summarize(&widgets);

    let export_file = if widgets.is_empty() {
        None
    } else {
        match store.save_csv(&analysis::build_csv(&screenshots)) {
            Ok(name) => Some(name),
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist widget table");
                None
            }
        }
    };

    let (analysis, analysis_error) = if !req.enable_analysis {
        (None, None)
    } else if widgets.is_empty() {
        (None, Some("no widgets extracted".to_string()))
    } else {
        match model {
            None => (None, Some("analysis model not configured".to_string())),
            Some(model) => match analysis::analyze(&widgets, model) {
                Ok(result) => {
                    let block = persist_and_build(&result, store, cfg, &date);
                    (Some(block), None)
                }
                Err(err) => {
                    tracing::warn!(error = ?err, "analysis failed, returning extraction only");
                    // Keep the whole context chain; the outermost layer alone
                    // hides the root cause.
                    (None, Some(format!("{err:#}")))
                }
            },
        }
    };

    Ok(Response {
        success: true,
        date,
        screenshots,
        summary,
        export_file,
        analysis,
        analysis_error,
    })
}

fn summarize(widgets: &[Widget]) -> Summary {
    Summary {
        total_widgets: widgets.len(),
        widgets_with_trends: widgets.iter().filter(|w| w.trend.is_known()).count(),
        widgets_with_spikes: widgets
            .iter()
            .filter(|w| w.trend == vision::Trend::Spiking)
            .count(),
    }
}

/// Render and save the report; a save failure downgrades to in-line data.
fn persist_and_build(
    result: &analysis::AnalysisResult,
    store: &ReportStore,
    cfg: &ExtractConfig,
    date: &str,
) -> AnalysisBlock {
    let meta = ReportMeta {
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        date_range: date.to_string(),
        ocr_confidence_pct: (cfg.ocr_confidence_threshold * 100.0).round() as u32,
    };
    let rendered = analysis::render(result, &meta);

    let report_file = match store.save(&rendered) {
        Ok(name) => Some(name),
        Err(err) => {
            tracing::warn!(error = %err, "failed to persist report");
            None
        }
    };

    AnalysisBlock {
        summary: analysis::summary_line(result),
        performance_score: result.performance_score,
        issues: result.issues.clone(),
        immediate_actions: result.immediate_actions.clone(),
        short_term_actions: result.short_term_actions.clone(),
        long_term_actions: result.long_term_actions.clone(),
        report_file,
        model_used: result.model_used.clone(),
        tokens_used: result.tokens_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::ModelResponse;
    use std::io::Cursor;
    use vision::ImageView;

    struct FixedRecognizer(&'static str);

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _image: ImageView<'_>) -> String {
            self.0.to_string()
        }
    }

    struct CannedModel;

    impl LanguageModel for CannedModel {
        fn invoke(&self, _system: &str, _user: &str) -> Result<ModelResponse> {
            Ok(ModelResponse {
                content: "## Critical Issues & Alerts\n- widget looks hot\n\n- **Performance Score**: 7/10\n".to_string(),
                tokens_used: 42,
            })
        }

        fn model_id(&self) -> &str {
            "test-model"
        }
    }

    struct FailingModel;

    impl LanguageModel for FailingModel {
        fn invoke(&self, _system: &str, _user: &str) -> Result<ModelResponse> {
            anyhow::bail!("connection refused")
        }

        fn model_id(&self) -> &str {
            "test-model"
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 200, 200]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn request<'a>(infra: &'a [u8], system: &'a [u8]) -> Request<'a> {
        Request {
            infrastructure_image: infra,
            system_image: system,
            date: Some("2026-08-28"),
            enable_analysis: true,
            multi_widget: false,
        }
    }

    #[test]
    fn full_run_returns_widgets_summary_and_analysis() {
        let infra = png_bytes(200, 150);
        let system = png_bytes(200, 150);
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let cfg = ExtractConfig::default();

        let rec = FixedRecognizer("CPU Usage 38.9% Rising");
        let res = run(&cfg, &rec, Some(&CannedModel), &store, &request(&infra, &system)).unwrap();

        assert!(res.success);
        assert_eq!(res.date, "2026-08-28");
        assert_eq!(res.screenshots.len(), 2);
        assert_eq!(res.summary.total_widgets, 2);
        assert_eq!(res.summary.widgets_with_trends, 2);

        let block = res.analysis.expect("analysis block");
        assert_eq!(block.performance_score, Some(7.0));
        assert_eq!(block.issues.len(), 1);
        assert_eq!(block.issues[0].description, "widget looks hot");
        assert_eq!(block.model_used, "test-model");

        let saved = block.report_file.expect("report persisted");
        assert!(store.load(&saved).unwrap().contains("widget looks hot"));

        let exported = res.export_file.expect("widget table persisted");
        let csv = store.load(&exported).unwrap();
        assert!(csv.starts_with("role,widget_name,category"));
        assert!(csv.contains("CPU Usage"));
    }

    #[test]
    fn malformed_date_is_a_hard_failure() {
        let infra = png_bytes(50, 50);
        let system = png_bytes(50, 50);
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let cfg = ExtractConfig::default();

        let mut req = request(&infra, &system);
        req.date = Some("28-08-2026");
        let err = run(&cfg, &FixedRecognizer("x"), None, &store, &req).unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }

    #[test]
    fn unreadable_image_is_a_hard_failure() {
        let system = png_bytes(50, 50);
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let cfg = ExtractConfig::default();

        let req = request(b"not a png", &system);
        assert!(run(&cfg, &FixedRecognizer("x"), None, &store, &req).is_err());
    }

    #[test]
    fn model_failure_degrades_to_extraction_only() {
        let infra = png_bytes(50, 50);
        let system = png_bytes(50, 50);
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let cfg = ExtractConfig::default();

        let rec = FixedRecognizer("Memory Usage 92.9%");
        let res = run(&cfg, &rec, Some(&FailingModel), &store, &request(&infra, &system)).unwrap();

        assert!(res.success);
        assert_eq!(res.summary.total_widgets, 2);
        assert!(res.analysis.is_none());
        // The recorded reason keeps the whole chain, including the root cause.
        let reason = res.analysis_error.unwrap();
        assert!(reason.contains("analysis model call"));
        assert!(reason.contains("connection refused"));
        // No narrative report was written.
        assert!(store
            .list()
            .unwrap()
            .iter()
            .all(|e| !e.filename.ends_with(".md")));
    }

    #[test]
    fn analysis_disabled_records_no_error() {
        let infra = png_bytes(50, 50);
        let system = png_bytes(50, 50);
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let cfg = ExtractConfig::default();

        let mut req = request(&infra, &system);
        req.enable_analysis = false;
        let res = run(&cfg, &FixedRecognizer("Disk Usage 45%"), None, &store, &req).unwrap();

        assert!(res.analysis.is_none());
        assert!(res.analysis_error.is_none());
    }

    #[test]
    fn unconfigured_model_records_reason() {
        let infra = png_bytes(50, 50);
        let system = png_bytes(50, 50);
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let cfg = ExtractConfig::default();

        let res = run(&cfg, &FixedRecognizer("Disk Usage 45%"), None, &store, &request(&infra, &system)).unwrap();
        assert!(res.analysis.is_none());
        assert_eq!(res.analysis_error.as_deref(), Some("analysis model not configured"));
    }
}
