//! Test-case exporters.
//!
//! Each exporter renders the frozen [`TestCase`] snapshot into one artifact
//! in the output directory. Export runs after recording stops; one format
//! failing never blocks the others.

use std::path::{Path, PathBuf};

use crate::model::TestCase;

pub mod html;
pub mod json;
pub mod markdown;

pub use html::HtmlExporter;
pub use json::JsonExporter;
pub use markdown::MarkdownExporter;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait Exporter: Send + Sync {
    fn format_name(&self) -> &'static str;

    /// Write the artifact into `output_dir` and return its path.
    fn export(&self, testcase: &TestCase, output_dir: &Path) -> Result<PathBuf, ExportError>;
}

/// The standard artifact set, in write order.
pub fn default_exporters() -> Vec<Box<dyn Exporter>> {
    vec![
        Box::new(JsonExporter),
        Box::new(MarkdownExporter),
        Box::new(HtmlExporter),
    ]
}

/// Run every exporter, logging and skipping the ones that fail. Returns the
/// paths that were written.
pub fn export_all(
    exporters: &[Box<dyn Exporter>],
    testcase: &TestCase,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    for exporter in exporters {
        match exporter.export(testcase, output_dir) {
            Ok(path) => {
                tracing::info!(format = exporter.format_name(), path = %path.display(), "exported");
                written.push(path);
            }
            Err(e) => {
                tracing::warn!(
                    format = exporter.format_name(),
                    error = %e,
                    "exporter failed, continuing with remaining formats"
                );
            }
        }
    }
    Ok(written)
}
