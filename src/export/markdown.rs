//! Markdown exporter: the human-reviewable artifact.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::{ExportError, Exporter};
use crate::model::{NetworkEvent, TestCase};

pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn format_name(&self) -> &'static str {
        "markdown"
    }

    fn export(&self, testcase: &TestCase, output_dir: &Path) -> Result<PathBuf, ExportError> {
        let path = output_dir.join("testcase.md");
        fs::write(&path, render(testcase))?;
        Ok(path)
    }
}

fn render(testcase: &TestCase) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}", testcase.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "- **ID:** {}", testcase.id);
    let _ = writeln!(
        out,
        "- **Recorded:** {}",
        testcase.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "- **Start URL:** {}", testcase.start_url);
    let _ = writeln!(out, "- **Browser:** {}", testcase.browser);
    let _ = writeln!(
        out,
        "- **Viewport:** {}x{}",
        testcase.viewport.width, testcase.viewport.height
    );
    let _ = writeln!(
        out,
        "- **Duration:** {:.1}s over {} steps",
        testcase.total_duration_secs, testcase.total_steps
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "## Steps");

    for step in &testcase.steps {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "### {}. {}",
            step.sequence_number, step.short_description
        );
        if let Some(element) = &step.element {
            let _ = writeln!(out);
            let _ = writeln!(out, "- Selector: `{}`", element.selector);
            let _ = writeln!(out, "- Path: `{}`", element.structural_path);
        }
        if let Some(value) = &step.input_value {
            let _ = writeln!(out, "- Value: `{value}`");
        }
        if let Some(key) = &step.key {
            let _ = writeln!(out, "- Key: `{key}`");
        }
        if let Some(shot) = &step.screenshot {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "![Step {}]({})",
                step.sequence_number,
                shot.0.display()
            );
        }
        if !step.network_events.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Network during this step:");
            let _ = writeln!(out);
            for event in &step.network_events {
                let _ = writeln!(out, "- {}", network_line(event));
            }
        }
        if !step.console_events.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Console during this step:");
            let _ = writeln!(out);
            for event in &step.console_events {
                let _ = writeln!(out, "- `{:?}` {}", event.level, event.message);
            }
        }
    }

    if !testcase.page_faults.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Page errors");
        let _ = writeln!(out);
        for fault in &testcase.page_faults {
            let _ = writeln!(out, "- {}", fault.message);
        }
    }

    if !testcase.overflow_network_events.is_empty() || !testcase.overflow_console_events.is_empty()
    {
        let _ = writeln!(out);
        let _ = writeln!(out, "## After the last step");
        let _ = writeln!(out);
        for event in &testcase.overflow_network_events {
            let _ = writeln!(out, "- {}", network_line(event));
        }
        for event in &testcase.overflow_console_events {
            let _ = writeln!(out, "- `{:?}` {}", event.level, event.message);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "_{} network events, {} console events across the session._",
        testcase.network_events.len(),
        testcase.console_events.len()
    );
    out
}

fn network_line(event: &NetworkEvent) -> String {
    match (&event.status, &event.error) {
        (_, Some(error)) => format!("`{} {}` failed: {error}", event.method, event.url),
        (Some(status), _) => format!("`{} {}` → {status}", event.method, event.url),
        (None, None) => format!("`{} {}` (no response)", event.method, event.url),
    }
}
