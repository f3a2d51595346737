//! Widget classification.
//!
//! Assigns a semantic category to a widget from keywords in its recognized
//! text. The rules are a data-driven ordered table evaluated by one generic
//! matcher; adding a category means appending a rule, never touching the
//! matching logic. Rule order is the tie-breaker for ambiguous text ("cache
//! hit rate" is claimed by the Database rule before Performance ever sees it).

use crate::widget::Category;

/// One classification rule: if any keyword occurs in the text, the rule's
/// category applies. First matching rule wins.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub keywords: &'static [&'static str],
    pub category: Category,
}

/// Ordered rule table, checked top to bottom.
pub const RULES: &[Rule] = &[
    Rule {
        keywords: &["cpu", "processor", "core", "load"],
        category: Category::Infrastructure,
    },
    Rule {
        keywords: &["memory", "ram"],
        category: Category::System,
    },
    Rule {
        keywords: &["disk", "storage", "io", "filesystem"],
        category: Category::Storage,
    },
    Rule {
        keywords: &["network", "tcp", "mbps", "bandwidth", "traffic"],
        category: Category::Network,
    },
    Rule {
        keywords: &["response", "latency"],
        category: Category::Performance,
    },
    Rule {
        keywords: &["throughput", "req/s", "rps"],
        category: Category::Performance,
    },
    Rule {
        keywords: &["error", "failed", "failure"],
        category: Category::Reliability,
    },
    Rule {
        keywords: &["connection", "db", "query", "lock", "cache", "sql"],
        category: Category::Database,
    },
    Rule {
        keywords: &["queue", "session", "worker", "upload"],
        category: Category::Application,
    },
    Rule {
        keywords: &["pod", "container", "node"],
        category: Category::Container,
    },
    Rule {
        keywords: &["log", "alert", "backup", "ssl", "cert"],
        category: Category::Observability,
    },
];

/// Category used when no rule matches.
pub const DEFAULT_CATEGORY: Category = Category::System;

/// Name used when no plausible title was extracted.
pub const UNKNOWN_WIDGET: &str = "Unknown Widget";

/// Match text against the rule table. Keywords match on word-token
/// boundaries ("load" does not fire on "upload"); keywords that carry
/// punctuation ("req/s") match as substrings.
pub fn classify(text: &str) -> Option<Category> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for rule in RULES {
        for kw in rule.keywords {
            let hit = if kw.chars().all(char::is_alphanumeric) {
                tokens.iter().any(|t| t == kw)
            } else {
                lower.contains(kw)
            };
            if hit {
                return Some(rule.category);
            }
        }
    }
    None
}

/// Final name + category for a widget, from its raw text and parsed title.
pub fn classify_widget(raw_text: &str, title: Option<&str>) -> (String, Category) {
    // Classification sees both the title and the body text; the title is
    // the stronger signal when OCR mangled the body.
    let combined = match title {
        Some(t) => format!("{raw_text} {t}"),
        None => raw_text.to_string(),
    };

    let category = classify(&combined).unwrap_or(DEFAULT_CATEGORY);
    let name = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_WIDGET.to_string());

    (name, category)
}
