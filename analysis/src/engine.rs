//! Analysis engine.
//!
//! Builds a deterministic rollup of the extracted widgets, asks the language
//! model for a narrative, and parses the markdown reply back into structured
//! data. A reply that skips sections degrades to the rollup alone; only the
//! model call itself can fail.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use vision::widget::{Status, Trend, Widget};

use crate::model::LanguageModel;

/// Deterministic summary computed before (and independent of) the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetRollup {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub with_trends: usize,
    pub with_spikes: usize,
    /// Widgets where nothing beyond raw text could be parsed.
    pub minimal: usize,
    pub critical: Vec<String>,
    pub warning: Vec<String>,
}

impl WidgetRollup {
    pub fn build(widgets: &[Widget]) -> Self {
        let mut rollup = Self {
            total: widgets.len(),
            ..Self::default()
        };

        for w in widgets {
            *rollup.by_category.entry(w.category.to_string()).or_default() += 1;
            if w.trend.is_known() {
                rollup.with_trends += 1;
            }
            if w.trend == Trend::Spiking {
                rollup.with_spikes += 1;
            }
            if w.is_minimal() {
                rollup.minimal += 1;
            }
            match w.status {
                Status::Critical => rollup.critical.push(w.name.clone()),
                Status::Warning => rollup.warning.push(w.name.clone()),
                Status::Info => {}
            }
        }

        rollup
    }
}

/// One reported issue with the severity read out of its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Status,
    pub description: String,
}

impl Issue {
    /// Items come from the "Critical Issues" section, so that is the default
    /// severity; an explicit softer marker in the text downgrades it.
    fn from_item(description: String) -> Self {
        let lower = description.to_lowercase();
        let severity = if lower.contains("warning") {
            Status::Warning
        } else if lower.contains("info") {
            Status::Info
        } else {
            Status::Critical
        };
        Self { severity, description }
    }
}

/// Structured result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub raw_markdown: String,
    /// In [0,10] when the reply contained a score line.
    pub performance_score: Option<f64>,
    pub issues: Vec<Issue>,
    pub immediate_actions: Vec<String>,
    pub short_term_actions: Vec<String>,
    pub long_term_actions: Vec<String>,
    pub rollup: WidgetRollup,
    pub model_used: String,
    pub tokens_used: u32,
}

/// Widget projection embedded in the prompt. Measurements are flattened to
/// display strings; the model reads text, not our types.
#[derive(Serialize)]
struct PromptWidget<'a> {
    widget_name: &'a str,
    category: String,
    current: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    trend: String,
    status: String,
    spike_time: Option<&'a str>,
    raw_text: &'a str,
}

const SYSTEM_PROMPT: &str = "\
You are an expert DevOps and infrastructure monitoring analyst. You are \
given widget data extracted from dashboard screenshots.

Your task is to:
1. Analyze each widget's metrics and trends
2. Identify issues, anomalies, and patterns
3. Provide actionable recommendations

Reply in markdown using exactly this structure:

## Widget Analysis Summary
[One paragraph overview]

## Critical Issues & Alerts
- [One bullet per issue needing immediate attention]

## Recommendations

### Immediate Actions (< 1 hour)
- [Urgent actions]

### Short-term Actions (< 24 hours)
- [Short-term improvements]

### Long-term Optimizations (< 1 week)
- [Strategic improvements]

## Key Metrics Summary
- **Performance Score**: X/10

Focus on actionable insights, correlations between metrics, and normal vs \
abnormal ranges for each metric type. Use severity levels (Critical, \
Warning, Info) where relevant.";

/// Build the (system, user) prompt pair for one widget set.
pub fn build_prompts(widgets: &[Widget]) -> (String, String) {
    let projected: Vec<PromptWidget<'_>> = widgets
        .iter()
        .map(|w| PromptWidget {
            widget_name: &w.name,
            category: w.category.to_string(),
            current: w.current_value.map(|m| m.to_string()),
            min: w.min,
            max: w.max,
            trend: w.trend.to_string(),
            status: w.status.to_string(),
            spike_time: w.spike_time.as_deref(),
            raw_text: &w.raw_text,
        })
        .collect();

    // Serialization of plain strings and numbers cannot fail.
    let widgets_json = serde_json::to_string_pretty(&projected).unwrap_or_default();

    let user = format!(
        "Please analyze the following dashboard monitoring data:\n\n\
         ```json\n{widgets_json}\n```\n\n\
         Consider CPU and memory patterns, disk I/O, network traffic, \
         response times, error rates, time correlations between metrics, \
         and capacity implications.\n\n\
         Generate a markdown report following the specified format."
    );

    (SYSTEM_PROMPT.to_string(), user)
}

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*10\b").unwrap());

#[derive(Debug, Default)]
struct ParsedSections {
    performance_score: Option<f64>,
    issues: Vec<Issue>,
    immediate: Vec<String>,
    short_term: Vec<String>,
    long_term: Vec<String>,
}

/// Pull structured data out of the model's markdown reply. Headings are
/// matched by their text so decorations (emoji, numbering) don't break it.
fn parse_response(markdown: &str) -> ParsedSections {
    #[derive(PartialEq)]
    enum Section {
        None,
        Issues,
        Immediate,
        ShortTerm,
        LongTerm,
    }

    let mut parsed = ParsedSections::default();
    let mut section = Section::None;

    for line in markdown.lines() {
        let line = line.trim();

        // Score lines are metadata, never section content, even when they
        // appear as a bullet inside a collected section.
        if line.contains("Performance Score") {
            if parsed.performance_score.is_none() {
                if let Some(cap) = SCORE_RE.captures(line) {
                    if let Ok(score) = cap[1].parse::<f64>() {
                        parsed.performance_score = Some(score.clamp(0.0, 10.0));
                    }
                }
            }
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ").or_else(|| line.strip_prefix("### ")) {
            section = if heading.contains("Critical Issues") {
                Section::Issues
            } else if heading.contains("Immediate Actions") {
                Section::Immediate
            } else if heading.contains("Short-term Actions") {
                Section::ShortTerm
            } else if heading.contains("Long-term Optimizations") {
                Section::LongTerm
            } else if line.starts_with("## ") {
                // A new top-level section closes any open list.
                Section::None
            } else {
                section
            };
            continue;
        }

        if let Some(item) = line.strip_prefix("- ") {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            match section {
                Section::Issues => parsed.issues.push(Issue::from_item(item.to_string())),
                Section::Immediate => parsed.immediate.push(item.to_string()),
                Section::ShortTerm => parsed.short_term.push(item.to_string()),
                Section::LongTerm => parsed.long_term.push(item.to_string()),
                Section::None => {}
            }
        }
    }

    parsed
}

/// Run one analysis: rollup, model call, response parsing.
pub fn analyze(widgets: &[Widget], model: &dyn LanguageModel) -> Result<AnalysisResult> {
    let rollup = WidgetRollup::build(widgets);
    let (system, user) = build_prompts(widgets);

    let response = model.invoke(&system, &user).context("analysis model call")?;
    let sections = parse_response(&response.content);

    Ok(AnalysisResult {
        raw_markdown: response.content,
        performance_score: sections.performance_score,
        issues: sections.issues,
        immediate_actions: sections.immediate,
        short_term_actions: sections.short_term,
        long_term_actions: sections.long_term,
        rollup,
        model_used: model.model_id().to_string(),
        tokens_used: response.tokens_used,
    })
}
