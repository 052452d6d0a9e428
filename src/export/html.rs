//! HTML exporter: a single self-contained report. Screenshots are embedded
//! as base64 data URIs so the file can be shared without its directory.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::export::{ExportError, Exporter};
use crate::model::{Step, TestCase};

pub struct HtmlExporter;

impl Exporter for HtmlExporter {
    fn format_name(&self) -> &'static str {
        "html"
    }

    fn export(&self, testcase: &TestCase, output_dir: &Path) -> Result<PathBuf, ExportError> {
        let path = output_dir.join("testcase.html");
        fs::write(&path, render(testcase, output_dir))?;
        Ok(path)
    }
}

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 60rem; margin: 2rem auto; color: #222; }\n\
.meta { color: #555; font-size: 0.9rem; }\n\
.step { border: 1px solid #ddd; border-radius: 6px; padding: 1rem; margin: 1rem 0; }\n\
.step img { max-width: 100%; border: 1px solid #ccc; margin-top: 0.5rem; }\n\
.selector { font-family: monospace; background: #f4f4f4; padding: 0 0.3rem; }\n\
.net, .console { font-size: 0.85rem; color: #444; }\n\
.error { color: #a00; }\n";

fn render(testcase: &TestCase, output_dir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html><head><meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>{}</title>", escape(&testcase.name));
    let _ = writeln!(out, "<style>{STYLE}</style></head><body>");

    let _ = writeln!(out, "<h1>{}</h1>", escape(&testcase.name));
    let _ = writeln!(
        out,
        "<p class=\"meta\">{} &middot; {} &middot; {} &middot; {:.1}s &middot; {} steps</p>",
        escape(&testcase.id),
        escape(&testcase.start_url),
        escape(&testcase.browser),
        testcase.total_duration_secs,
        testcase.total_steps
    );

    for step in &testcase.steps {
        render_step(&mut out, step, output_dir);
    }

    if !testcase.page_faults.is_empty() {
        let _ = writeln!(out, "<h2>Page errors</h2><ul>");
        for fault in &testcase.page_faults {
            let _ = writeln!(out, "<li class=\"error\">{}</li>", escape(&fault.message));
        }
        let _ = writeln!(out, "</ul>");
    }

    let _ = writeln!(out, "</body></html>");
    out
}

fn render_step(out: &mut String, step: &Step, output_dir: &Path) {
    let _ = writeln!(out, "<div class=\"step\">");
    let _ = writeln!(
        out,
        "<h2>{}. {}</h2>",
        step.sequence_number,
        escape(&step.short_description)
    );
    if let Some(element) = &step.element {
        let _ = writeln!(
            out,
            "<p>Element: <span class=\"selector\">{}</span></p>",
            escape(&element.selector)
        );
    }
    if let Some(shot) = &step.screenshot {
        match embed_image(&shot.0, output_dir) {
            Some(data_uri) => {
                let _ = writeln!(
                    out,
                    "<img src=\"{data_uri}\" alt=\"Step {}\">",
                    step.sequence_number
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "<p class=\"meta\">Screenshot unavailable: {}</p>",
                    escape(&shot.0.display().to_string())
                );
            }
        }
    }
    if !step.network_events.is_empty() {
        let _ = writeln!(out, "<ul class=\"net\">");
        for event in &step.network_events {
            let status = match (&event.status, &event.error) {
                (_, Some(error)) => format!("<span class=\"error\">{}</span>", escape(error)),
                (Some(status), _) => status.to_string(),
                (None, None) => "?".to_string(),
            };
            let _ = writeln!(
                out,
                "<li>{} {} &rarr; {status}</li>",
                escape(&event.method),
                escape(&event.url)
            );
        }
        let _ = writeln!(out, "</ul>");
    }
    if !step.console_events.is_empty() {
        let _ = writeln!(out, "<ul class=\"console\">");
        for event in &step.console_events {
            let _ = writeln!(
                out,
                "<li>{:?}: {}</li>",
                event.level,
                escape(&event.message)
            );
        }
        let _ = writeln!(out, "</ul>");
    }
    let _ = writeln!(out, "</div>");
}

/// Read the screenshot and encode it as a PNG data URI. Relative paths
/// resolve against the output directory.
fn embed_image(path: &Path, output_dir: &Path) -> Option<String> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        output_dir.join(path)
    };
    match fs::read(&resolved) {
        Ok(bytes) => Some(format!("data:image/png;base64,{}", BASE64.encode(bytes))),
        Err(e) => {
            tracing::warn!(path = %resolved.display(), error = %e, "screenshot not embeddable");
            None
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
