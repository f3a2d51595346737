//! Health surface.
//!
//! Cheap local checks only: model files on disk, API key presence, report
//! directory writability. Callers use this to decide whether to enable the
//! analysis step before accepting work.

use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub ocr: OcrHealth,
    pub analysis: AnalysisHealth,
    pub reports_writable: bool,
}

#[derive(Debug, Serialize)]
pub struct OcrHealth {
    pub engine: &'static str,
    pub models_present: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalysisHealth {
    pub api_key_configured: bool,
    pub endpoint: String,
    pub model: String,
}

pub fn check(cfg: &Config) -> Health {
    let models_present = cfg.ocr.detection_model.is_file()
        && cfg.ocr.recognition_model.is_file()
        && cfg.ocr.charset.is_file();

    let reports_writable = probe_writable(cfg);

    let status = if models_present && reports_writable {
        "healthy"
    } else {
        "degraded"
    };

    Health {
        status,
        ocr: OcrHealth {
            engine: vision::ocr::ENGINE_NAME,
            models_present,
        },
        analysis: AnalysisHealth {
            api_key_configured: !cfg.model.api_key.is_empty(),
            endpoint: cfg.model.endpoint.clone(),
            model: cfg.model.model.clone(),
        },
        reports_writable,
    }
}

fn probe_writable(cfg: &Config) -> bool {
    if std::fs::create_dir_all(&cfg.report_dir).is_err() {
        return false;
    }
    let probe = cfg.report_dir.join(".health_probe");
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_degrade_health() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.report_dir = dir.path().join("reports");
        cfg.ocr.detection_model = dir.path().join("missing.onnx");

        let health = check(&cfg);
        assert_eq!(health.status, "degraded");
        assert!(!health.ocr.models_present);
        assert!(health.reports_writable);
    }

    #[test]
    fn api_key_presence_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.report_dir = dir.path().to_path_buf();

        assert!(!check(&cfg).analysis.api_key_configured);
        cfg.model.api_key = "sk-test".to_string();
        assert!(check(&cfg).analysis.api_key_configured);
    }
}
