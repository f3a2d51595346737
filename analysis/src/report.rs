//! Report rendering.
//!
//! Wraps the model's narrative in a fixed markdown frame with generation
//! metadata so a saved report is self-describing.

use crate::engine::AnalysisResult;

/// Context lines shown in the report header and footer.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Human-readable generation timestamp.
    pub generated_at: String,
    /// The date (range) the screenshots cover.
    pub date_range: String,
    /// OCR confidence cutoff used during extraction, in percent.
    pub ocr_confidence_pct: u32,
}

pub fn render(analysis: &AnalysisResult, meta: &ReportMeta) -> String {
    let narrative = if analysis.raw_markdown.trim().is_empty() {
        "No analysis available"
    } else {
        analysis.raw_markdown.trim()
    };

    format!(
        "\
# Dashboard Monitoring Analysis Report

**Generated:** {generated_at}
**Widgets Analyzed:** {widget_count}
**Analysis Model:** {model}

---

{narrative}

---

## Technical Details

**Analysis Parameters:**
- OCR Confidence Threshold: > {ocr_pct}%
- Model Used: {model}
- Tokens Consumed: {tokens}

**Data Sources:**
- Date Range: {date_range}

## Next Steps

1. **Review Critical Issues** - Address any items marked as urgent
2. **Implement Recommendations** - Follow the prioritized action plan
3. **Monitor Progress** - Track metrics improvement over time
4. **Schedule Follow-up** - Plan the next analysis cycle
",
        generated_at = meta.generated_at,
        widget_count = analysis.rollup.total,
        model = analysis.model_used,
        ocr_pct = meta.ocr_confidence_pct,
        tokens = analysis.tokens_used,
        date_range = meta.date_range,
    )
}

/// One-line summary for the response payload.
pub fn summary_line(analysis: &AnalysisResult) -> String {
    let mut parts = Vec::new();
    if let Some(score) = analysis.performance_score {
        parts.push(format!("Performance Score: {score}/10"));
    }
    if !analysis.issues.is_empty() {
        parts.push(format!("Critical Issues: {}", analysis.issues.len()));
    }
    let recs = analysis.immediate_actions.len()
        + analysis.short_term_actions.len()
        + analysis.long_term_actions.len();
    if recs > 0 {
        parts.push(format!("Recommendations: {recs}"));
    }

    if parts.is_empty() {
        "Analysis completed".to_string()
    } else {
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Issue, WidgetRollup};
    use vision::widget::Status;

    fn result(markdown: &str, score: Option<f64>) -> AnalysisResult {
        AnalysisResult {
            raw_markdown: markdown.to_string(),
            performance_score: score,
            issues: vec![Issue {
                severity: Status::Critical,
                description: "memory pressure".to_string(),
            }],
            immediate_actions: vec!["restart service".to_string()],
            short_term_actions: vec![],
            long_term_actions: vec![],
            rollup: WidgetRollup {
                total: 4,
                ..WidgetRollup::default()
            },
            model_used: "gpt-4o".to_string(),
            tokens_used: 2100,
        }
    }

    #[test]
    fn report_frame_carries_metadata() {
        let meta = ReportMeta {
            generated_at: "2026-08-28 10:15:00".to_string(),
            date_range: "2026-08-28".to_string(),
            ocr_confidence_pct: 30,
        };
        let out = render(&result("## Narrative body", Some(7.0)), &meta);

        assert!(out.starts_with("# Dashboard Monitoring Analysis Report"));
        assert!(out.contains("**Widgets Analyzed:** 4"));
        assert!(out.contains("**Analysis Model:** gpt-4o"));
        assert!(out.contains("## Narrative body"));
        assert!(out.contains("Tokens Consumed: 2100"));
        assert!(out.contains("Date Range: 2026-08-28"));
    }

    #[test]
    fn empty_narrative_is_marked_unavailable() {
        let meta = ReportMeta {
            generated_at: "now".to_string(),
            date_range: "N/A".to_string(),
            ocr_confidence_pct: 30,
        };
        let out = render(&result("   ", None), &meta);
        assert!(out.contains("No analysis available"));
    }

    #[test]
    fn summary_line_joins_present_parts() {
        let s = summary_line(&result("x", Some(6.5)));
        assert_eq!(s, "Performance Score: 6.5/10 | Critical Issues: 1 | Recommendations: 1");

        let mut empty = result("x", None);
        empty.issues.clear();
        empty.immediate_actions.clear();
        assert_eq!(summary_line(&empty), "Analysis completed");
    }
}
