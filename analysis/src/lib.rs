//! Model-backed analysis of extracted dashboard widgets.
//!
//! The engine turns a widget set into a prompt, calls an OpenAI-compatible
//! chat endpoint, and parses the markdown reply into structured data. The
//! rendered report is persisted through [`store::ReportStore`].

pub mod engine;
pub mod export;
pub mod model;
pub mod report;
pub mod store;

pub use engine::{analyze, AnalysisResult, Issue, WidgetRollup};
pub use export::build_csv;
pub use model::{LanguageModel, ModelConfig, ModelResponse, OpenAiChat};
pub use report::{render, summary_line, ReportMeta};
pub use store::{ReportEntry, ReportStore};
