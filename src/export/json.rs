//! JSON exporter: the lossless machine-readable artifact.

use std::fs;
use std::path::{Path, PathBuf};

use crate::export::{ExportError, Exporter};
use crate::model::TestCase;

pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn export(&self, testcase: &TestCase, output_dir: &Path) -> Result<PathBuf, ExportError> {
        let path = output_dir.join("testcase.json");
        let json = serde_json::to_string_pretty(testcase)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}
