//! Reporting: terminal summaries and the Markdown analysis report.

pub mod document;
pub mod format;

pub use document::*;
pub use format::*;
