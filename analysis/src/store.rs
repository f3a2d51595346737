//! Report persistence.
//!
//! Reports live as flat markdown files in one directory, named by their
//! generation timestamp. Names are handed back to clients and accepted for
//! later download, so loading validates that a name cannot escape the
//! directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};

pub struct ReportStore {
    dir: PathBuf,
}

/// Directory listing entry for one stored report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReportEntry {
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: String,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a narrative report, returning the filename it was stored under.
    ///
    /// Names derive from the wall clock; if two runs land in the same second
    /// the later one gets a numeric suffix. First writer wins via
    /// `create_new`, so concurrent runs never clobber each other.
    pub fn save(&self, content: &str) -> Result<String> {
        self.save_at(content, "dashboard_analysis", "md", Local::now())
    }

    /// Persist the widget table CSV alongside the reports.
    pub fn save_csv(&self, content: &str) -> Result<String> {
        self.save_at(content, "dashboard_widgets", "csv", Local::now())
    }

    fn save_at(
        &self,
        content: &str,
        prefix: &str,
        ext: &str,
        now: DateTime<Local>,
    ) -> Result<String> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create report dir {}", self.dir.display()))?;

        let stem = format!("{prefix}_{}", now.format("%Y%m%d_%H%M%S"));
        for attempt in 0..100u32 {
            let filename = if attempt == 0 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}-{attempt}.{ext}")
            };
            let path = self.dir.join(&filename);

            match fs::File::create_new(&path) {
                Ok(file) => {
                    use std::io::Write;
                    let mut file = file;
                    file.write_all(content.as_bytes())
                        .with_context(|| format!("write report {}", path.display()))?;
                    return Ok(filename);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("create report {}", path.display()));
                }
            }
        }
        bail!("could not find a free report filename under {}", self.dir.display());
    }

    /// Load a stored artifact by the filename `save` or `save_csv` returned.
    pub fn load(&self, filename: &str) -> Result<String> {
        let known_ext = filename.ends_with(".md") || filename.ends_with(".csv");
        if filename.contains(['/', '\\']) || filename.contains("..") || !known_ext {
            bail!("invalid report filename: {filename:?}");
        }
        let path = self.dir.join(filename);
        fs::read_to_string(&path).with_context(|| format!("read report {}", path.display()))
    }

    /// All stored reports, newest first.
    pub fn list(&self) -> Result<Vec<ReportEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(iter) => iter,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("list reports in {}", self.dir.display()));
            }
        };

        let mut reports = Vec::new();
        for entry in entries {
            let entry = entry.context("read report dir entry")?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(".md") && !name.ends_with(".csv") {
                continue;
            }
            let meta = entry.metadata().context("report metadata")?;
            let created = meta.created().or_else(|_| meta.modified()).unwrap_or(SystemTime::UNIX_EPOCH);
            reports.push((
                created,
                ReportEntry {
                    filename: name.to_string(),
                    size_bytes: meta.len(),
                    created_at: DateTime::<Local>::from(created)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                },
            ));
        }

        reports.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.filename.cmp(&a.1.filename)));
        Ok(reports.into_iter().map(|(_, e)| e).collect())
    }
}
