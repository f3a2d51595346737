//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Paths to the OCR model files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrPaths {
    pub detection_model: PathBuf,
    pub recognition_model: PathBuf,
    pub charset: PathBuf,
}

impl Default for OcrPaths {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashlens")
            .join("models");
        Self {
            detection_model: base.join("det.onnx"),
            recognition_model: base.join("rec.onnx"),
            charset: base.join("charset.txt"),
        }
    }
}

/// On-disk configuration for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Extraction tunables (detection thresholds, OCR cutoff, pool size).
    pub extract: vision::ExtractConfig,

    /// Language model endpoint and parameters. The API key may also come
    /// from `OPENAI_API_KEY`, which takes precedence when set.
    pub model: analysis::ModelConfig,

    /// Where generated reports are written.
    pub report_dir: PathBuf,

    pub ocr: OcrPaths,
}

impl Default for Config {
    fn default() -> Self {
        let report_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashlens")
            .join("reports");
        Self {
            extract: vision::ExtractConfig::default(),
            model: analysis::ModelConfig::default(),
            report_dir,
            ocr: OcrPaths::default(),
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("dashlens.json"))
    }

    /// Load configuration from disk, falling back to defaults on missing file.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        let path = Self::path()?;
        let mut cfg = if path.exists() {
            let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
            serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?
        } else {
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    /// Environment overrides; the key never has to live in a file.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.model.api_key = key;
            }
        }
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.extract.ocr_confidence_threshold, 0.30);
        assert_eq!(back.model.model, "gpt-4o");
        assert_eq!(back.model.timeout_secs, 60);
    }
}
