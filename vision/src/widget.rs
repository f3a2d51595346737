//! Widget data model.
//!
//! A `Widget` is the finalized unit of meaning for one dashboard panel:
//! whatever the pipeline could read out of a region, typed and immutable
//! after classification. Fields that could not be parsed stay `None` or
//! `Unknown`; a widget is never rejected for being partially readable.

use serde::{Deserialize, Serialize};

use crate::detect::Region;

/// Qualitative direction of a metric over its visible time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Falling,
    Spiking,
    Stable,
    Normal,
    Unknown,
}

impl Trend {
    pub fn is_known(&self) -> bool {
        !matches!(self, Trend::Unknown)
    }
}

impl Default for Trend {
    fn default() -> Self {
        Trend::Unknown
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Rising => "Rising",
            Trend::Falling => "Falling",
            Trend::Spiking => "Spiking",
            Trend::Stable => "Stable",
            Trend::Normal => "Normal",
            Trend::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Alert severity derived from keywords in the recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Info,
    Warning,
    Critical,
}

impl Default for Status {
    fn default() -> Self {
        Status::Info
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Info => "Info",
            Status::Warning => "Warning",
            Status::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Closed set of widget categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Infrastructure,
    System,
    Storage,
    Network,
    Performance,
    Reliability,
    Database,
    Application,
    Container,
    Observability,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Infrastructure => "Infrastructure",
            Category::System => "System",
            Category::Storage => "Storage",
            Category::Network => "Network",
            Category::Performance => "Performance",
            Category::Reliability => "Reliability",
            Category::Database => "Database",
            Category::Application => "Application",
            Category::Container => "Container",
            Category::Observability => "Observability",
        };
        f.write_str(s)
    }
}

/// Unit suffix attached to a numeric reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Percent,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
    Millis,
    Seconds,
    MegabytesPerSec,
    Kbps,
    Mbps,
    Gbps,
    RequestsPerSec,
    OpsPerSec,
    /// Bare number with no recognizable unit.
    Count,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Kilobytes => "KB",
            Unit::Megabytes => "MB",
            Unit::Gigabytes => "GB",
            Unit::Terabytes => "TB",
            Unit::Millis => "ms",
            Unit::Seconds => "s",
            Unit::MegabytesPerSec => "MB/s",
            Unit::Kbps => "Kbps",
            Unit::Mbps => "Mbps",
            Unit::Gbps => "Gbps",
            Unit::RequestsPerSec => "req/s",
            Unit::OpsPerSec => "ops/s",
            Unit::Count => "",
        }
    }
}

/// A numeric reading with its unit kept separate from the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub magnitude: f64,
    pub unit: Unit,
}

impl Measurement {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }
}

/// Format a magnitude without a trailing `.0` so "92.9%" round-trips exactly.
fn fmt_magnitude(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit {
            // Percent readings are written without a separating space.
            Unit::Percent => write!(f, "{}%", fmt_magnitude(self.magnitude)),
            Unit::Count => f.write_str(&fmt_magnitude(self.magnitude)),
            unit => write!(f, "{} {}", fmt_magnitude(self.magnitude), unit.suffix()),
        }
    }
}

/// Serialize `Option<f64>` as a display string, with `"N/A"` for `None`.
///
/// Dashboards routinely lack a visible min/max; downstream consumers expect
/// a string column, not a nullable number.
pub mod opt_na {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<f64>, ser: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(n) => ser.serialize_str(&super::fmt_magnitude(*n)),
            None => ser.serialize_str("N/A"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
        let s = String::deserialize(de)?;
        if s.is_empty() || s.eq_ignore_ascii_case("n/a") {
            return Ok(None);
        }
        s.parse::<f64>().map(Some).map_err(serde::de::Error::custom)
    }
}

/// One extracted dashboard widget. Created once per detection run and never
/// mutated after classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    /// Non-empty; `"Unknown Widget"` when no plausible title was found.
    pub name: String,
    pub category: Category,
    pub current_value: Option<Measurement>,
    #[serde(with = "opt_na")]
    pub min: Option<f64>,
    #[serde(with = "opt_na")]
    pub max: Option<f64>,
    pub trend: Trend,
    pub status: Status,
    /// Clock time associated with a spike, when one was visible (e.g. "11:05 AM").
    pub spike_time: Option<String>,
    /// Raw OCR output, kept for transparency and debugging.
    pub raw_text: String,
    /// Extraction confidence in [0,1] (from the text block, not the region).
    pub confidence: f32,
    pub source_region: Region,
    pub extracted_at: String,
}

impl Widget {
    /// A widget where nothing beyond the raw text could be parsed.
    pub fn is_minimal(&self) -> bool {
        self.current_value.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && !self.trend.is_known()
    }
}
