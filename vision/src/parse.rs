//! Field parsing.
//!
//! Converts noisy recognized text into typed metric fields. Everything here
//! degrades instead of failing: an unmatched trend is `Unknown`, an absent
//! range is `None`, arbitrary garbage input yields an all-default result.
//! This module must never panic on any input string.

use std::sync::LazyLock;

use regex::Regex;

use crate::widget::{Measurement, Status, Trend, Unit};

/// First numeric token with an optional unit suffix. Thousands separators and
/// decimal points are tolerated; longer unit spellings come first so `MB/s`
/// wins over `MB`.
static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(%|TB\b|GB\b|MB/s|MB\b|KB\b|Gbps\b|Mbps\b|Kbps\b|req/s|rps\b|ops/s|ms\b|s\b)?",
    )
    .expect("value regex")
});

/// `min/max` range: two numbers separated by a slash, units optional.
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*%?\s*/\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*%?",
    )
    .expect("range regex")
});

/// Clock time, optionally with an AM/PM suffix.
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2}:\d{2}(?::\d{2})?)(?:\s*(AM|PM))?\b").expect("time regex"));

/// Trend vocabulary in priority order: a spike mention wins over a generic
/// "rising" in the same text.
const TREND_WORDS: &[(Trend, &[&str])] = &[
    (Trend::Spiking, &["spike", "spiking", "peak", "surge"]),
    (Trend::Rising, &["rising", "increasing", "growing", "climbing"]),
    (Trend::Falling, &["falling", "decreasing", "dropping", "declining"]),
    (Trend::Stable, &["stable", "steady", "constant", "flat"]),
    (Trend::Normal, &["normal", "ok", "good", "healthy", "nominal"]),
];

const CRITICAL_WORDS: &[&str] = &["critical", "alert", "error", "failed", "down", "offline"];
const WARNING_WORDS: &[&str] = &["warning", "warn", "high", "elevated"];

/// Widget titles commonly seen on dashboards, checked before heuristics.
const KNOWN_TITLES: &[&str] = &[
    "CPU Usage",
    "CPU Utilization",
    "Memory Usage",
    "Memory Utilization",
    "Disk Usage",
    "Disk Space",
    "Network Traffic",
    "Network I/O",
    "Response Time",
    "Average Response Time",
    "Throughput",
    "Requests/sec",
    "Error Rate",
    "Error Count",
    "Load Average",
    "System Load",
    "Database Connections",
    "Cache Hit Rate",
    "Queue Length",
    "Concurrent Users",
    "Active Sessions",
    "Bandwidth Usage",
];

/// Everything the parser could read out of one text block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields {
    pub title: Option<String>,
    pub current: Option<Measurement>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub trend: Trend,
    pub status: Status,
    pub spike_time: Option<String>,
}

/// Parse all fields from raw text. Total: always returns, never errors.
pub fn parse_fields(text: &str) -> ParsedFields {
    let (min, max, masked) = parse_range(text);

    ParsedFields {
        title: extract_title(text),
        current: parse_value(&masked),
        min,
        max,
        trend: parse_trend(text),
        status: parse_status(text),
        spike_time: parse_spike_time(text),
    }
}

/// First numeric token (outside any range expression) with its unit.
fn parse_value(text: &str) -> Option<Measurement> {
    let caps = VALUE_RE.captures(text)?;
    let magnitude = parse_magnitude(caps.get(1)?.as_str())?;
    let unit = caps
        .get(2)
        .map(|m| parse_unit(m.as_str()))
        .unwrap_or(Unit::Count);
    Some(Measurement::new(magnitude, unit))
}

/// `min/max` pattern. Returns the parsed bounds plus a copy of the text with
/// the range span blanked out, so the value token search cannot mistake the
/// range for the current reading.
fn parse_range(text: &str) -> (Option<f64>, Option<f64>, String) {
    let Some(caps) = RANGE_RE.captures(text) else {
        return (None, None, text.to_string());
    };

    let min = caps.get(1).and_then(|m| parse_magnitude(m.as_str()));
    let max = caps.get(2).and_then(|m| parse_magnitude(m.as_str()));

    let whole = caps.get(0).expect("group 0");
    let mut masked = text.to_string();
    masked.replace_range(whole.range(), &" ".repeat(whole.len()));

    // OCR occasionally flips the bounds; keep min <= max.
    match (min, max) {
        (Some(a), Some(b)) if a > b => (Some(b), Some(a), masked),
        _ => (min, max, masked),
    }
}

fn parse_magnitude(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn parse_unit(raw: &str) -> Unit {
    match raw.to_ascii_lowercase().as_str() {
        "%" => Unit::Percent,
        "kb" => Unit::Kilobytes,
        "mb" => Unit::Megabytes,
        "gb" => Unit::Gigabytes,
        "tb" => Unit::Terabytes,
        "ms" => Unit::Millis,
        "s" => Unit::Seconds,
        "mb/s" => Unit::MegabytesPerSec,
        "kbps" => Unit::Kbps,
        "mbps" => Unit::Mbps,
        "gbps" => Unit::Gbps,
        "req/s" | "rps" => Unit::RequestsPerSec,
        "ops/s" => Unit::OpsPerSec,
        _ => Unit::Count,
    }
}

fn parse_trend(text: &str) -> Trend {
    let tokens = word_tokens(text);
    for (trend, words) in TREND_WORDS {
        if words.iter().any(|w| tokens.iter().any(|t| t == w)) {
            return *trend;
        }
    }
    Trend::Unknown
}

fn parse_status(text: &str) -> Status {
    let tokens = word_tokens(text);
    if CRITICAL_WORDS.iter().any(|w| tokens.iter().any(|t| t == w)) {
        return Status::Critical;
    }
    if WARNING_WORDS.iter().any(|w| tokens.iter().any(|t| t == w)) {
        return Status::Warning;
    }
    Status::Info
}

fn parse_spike_time(text: &str) -> Option<String> {
    let caps = TIME_RE.captures_iter(text).last()?;
    let time = caps.get(1)?.as_str();
    Some(match caps.get(2) {
        Some(ampm) => format!("{time} {}", ampm.as_str().to_ascii_uppercase()),
        None => time.to_string(),
    })
}

/// Widget title: known titles first, then a plausible non-numeric line.
fn extract_title(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for line in &lines {
        let lower = line.to_lowercase();
        for title in KNOWN_TITLES {
            if lower.contains(&title.to_lowercase()) {
                return Some((*title).to_string());
            }
        }
    }

    const TITLE_WORDS: &[&str] = &["usage", "rate", "time", "count", "average", "total", "load"];
    for line in &lines {
        if line.len() > 3
            && line.len() < 50
            && !line.starts_with(|c: char| c.is_ascii_digit() || "%$-+".contains(c))
        {
            let lower = line.to_lowercase();
            if TITLE_WORDS.iter().any(|w| lower.contains(w)) {
                return Some((*line).to_string());
            }
        }
    }

    // Fallback: first line that isn't just a reading.
    lines
        .iter()
        .find(|l| l.len() > 2 && !l.starts_with(|c: char| c.is_ascii_digit()))
        .map(|l| (*l).to_string())
}

fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
