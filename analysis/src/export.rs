//! Tabular export.
//!
//! Flattens the extracted widget sets into one CSV table so the data can be
//! reviewed in a spreadsheet alongside the narrative report. Absent fields
//! export as "N/A", matching the payload serialization.

use vision::WidgetSet;

const HEADER: &[&str] = &[
    "role",
    "widget_name",
    "category",
    "current_value",
    "min",
    "max",
    "trend",
    "status",
    "spike_time",
    "confidence",
    "extracted_at",
];

/// Build a CSV table over every widget of every set, header row first.
/// Row order follows set order, then detection order within a set.
pub fn build_csv(sets: &[WidgetSet]) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    rows.push(HEADER.iter().map(|s| (*s).to_string()).collect());

    for set in sets {
        for w in &set.widgets {
            rows.push(vec![
                set.role.clone(),
                w.name.clone(),
                w.category.to_string(),
                w.current_value
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
                fmt_bound(w.min),
                fmt_bound(w.max),
                w.trend.to_string(),
                w.status.to_string(),
                w.spike_time.clone().unwrap_or_else(|| "N/A".to_string()),
                format!("{:.2}", w.confidence),
                w.extracted_at.clone(),
            ]);
        }
    }

    let mut csv = String::new();
    for row in rows {
        let line = row
            .into_iter()
            .map(|field| escape_csv(&field))
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

fn fmt_bound(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn escape_csv(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let needs_quotes = value.contains(',') || value.contains('"') || value.contains('\n');
    if needs_quotes {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision::detect::Region;
    use vision::widget::{Category, Measurement, Status, Trend, Unit, Widget};
    use vision::DetectionMethod;

    fn widget(name: &str) -> Widget {
        Widget {
            name: name.to_string(),
            category: Category::Infrastructure,
            current_value: Some(Measurement::new(38.9, Unit::Percent)),
            min: Some(10.0),
            max: None,
            trend: Trend::Rising,
            status: Status::Info,
            spike_time: None,
            raw_text: "cpu usage 38.9% rising".to_string(),
            confidence: 0.875,
            source_region: Region::new(0, 0, 100, 100, 0.7),
            extracted_at: "2026-08-28T10:15:00".to_string(),
        }
    }

    fn set(role: &str, widgets: Vec<Widget>) -> WidgetSet {
        WidgetSet {
            role: role.to_string(),
            method: DetectionMethod::MultiWidgetDetection,
            widgets,
        }
    }

    #[test]
    fn table_has_header_and_one_row_per_widget() {
        let sets = vec![
            set("infrastructure", vec![widget("CPU Usage")]),
            set("system", vec![widget("Memory Usage"), widget("Disk Usage")]),
        ];

        let csv = build_csv(&sets);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("role,widget_name,category"));
        assert!(lines[1].starts_with("infrastructure,CPU Usage,Infrastructure,38.9%,10,N/A,Rising,Info,N/A,0.88,"));
        assert!(lines[2].starts_with("system,Memory Usage,"));
        assert!(lines[3].starts_with("system,Disk Usage,"));
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        let mut w = widget("Reads, Writes");
        w.spike_time = Some("11:05 AM".to_string());
        let csv = build_csv(&[set("system", vec![w])]);
        assert!(csv.contains(r#""Reads, Writes""#));
        assert!(csv.contains("11:05 AM"));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(escape_csv(r#"disk "sda" full"#), r#""disk ""sda"" full""#);
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv(""), "");
    }

    #[test]
    fn empty_sets_export_just_the_header() {
        let csv = build_csv(&[set("infrastructure", vec![])]);
        assert_eq!(csv.lines().count(), 1);
    }
}
