//! Command-line interface: `record` and `inspect`.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;

use crate::export::{default_exporters, export_all};
use crate::record::{run_from_tape, NullScreenshotter, SessionMeta, UnavailableBodyFetcher};
use crate::tape::EventTape;
use crate::util::text::sanitize_component;

#[derive(Debug, Parser)]
#[command(name = "casetape", version, about = "Record browser sessions into test-case artifacts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a session and export the test-case artifacts.
    Record {
        /// Target URL. Scheme defaults to https://.
        url: String,

        /// Output directory for the exported artifacts.
        #[arg(short, long, default_value = "testcases")]
        output: PathBuf,

        /// Test-case name. Derived from the URL when omitted.
        #[arg(short, long)]
        name: Option<String>,

        /// Browser to record with.
        #[arg(short, long, value_enum, default_value_t = BrowserKind::Chromium)]
        browser: BrowserKind,

        /// Run the browser without a visible window.
        #[arg(long)]
        headless: bool,

        /// Navigation timeout in milliseconds.
        #[arg(short, long, default_value_t = 30_000)]
        timeout: u64,

        /// Drive the session from a recorded event tape instead of a live
        /// browser.
        #[arg(long)]
        tape: Option<PathBuf>,
    },

    /// Summarize the contents of an event tape.
    Inspect {
        /// Path to a JSONL event tape.
        tape: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^https?://(localhost|\d{1,3}(\.\d{1,3}){3}|([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,})(:\d+)?(/\S*)?$",
        )
        .unwrap()
    })
}

/// Normalize and validate a target URL. Bare hostnames get `https://`.
pub fn validate_url(raw: &str) -> Result<String> {
    let url = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    if !url_pattern().is_match(&url) {
        bail!("invalid URL: {raw}");
    }
    Ok(url)
}

/// Derive a default test-case name from a URL: host plus path, with the
/// scheme and a leading `www.` stripped.
pub fn testcase_name_from_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let trimmed = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme)
        .trim_end_matches('/');
    if trimmed.is_empty() {
        "recording".to_string()
    } else {
        trimmed.replace('/', " ")
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Record {
            url,
            output,
            name,
            browser,
            headless: _,
            timeout: _,
            tape,
        } => run_record(url, output, name, browser, tape).await,
        Command::Inspect { tape } => run_inspect(tape),
    }
}

async fn run_record(
    url: String,
    output: PathBuf,
    name: Option<String>,
    browser: BrowserKind,
    tape: Option<PathBuf>,
) -> Result<()> {
    let url = validate_url(&url)?;
    let name = name.unwrap_or_else(|| testcase_name_from_url(&url));

    let Some(tape_path) = tape else {
        bail!(
            "no live browser driver is available in this build; \
             replay a recorded session with --tape <events.jsonl>"
        );
    };

    let tape = EventTape::read_from_path(&tape_path)
        .with_context(|| format!("reading event tape {}", tape_path.display()))?;
    tracing::info!(
        path = %tape_path.display(),
        entries = tape.entries.len(),
        "driving session from tape"
    );

    let meta = SessionMeta {
        name: name.clone(),
        start_url: url,
        browser: browser.as_str().to_string(),
        viewport: Default::default(),
        user_agent: browser.as_str().to_string(),
    };

    let testcase = run_from_tape(
        tape,
        meta,
        Arc::new(NullScreenshotter),
        Arc::new(UnavailableBodyFetcher),
    )
    .await;

    match testcase {
        Some(testcase) => {
            let out_dir = output.join(sanitize_component(&name, 60));
            let written = export_all(&default_exporters(), &testcase, &out_dir)?;
            println!(
                "Recorded {} ({} steps, {:.1}s)",
                testcase.id, testcase.total_steps, testcase.total_duration_secs
            );
            for path in written {
                println!("  wrote {}", path.display());
            }
        }
        None => println!("No steps recorded; nothing to export."),
    }
    Ok(())
}

fn run_inspect(path: PathBuf) -> Result<()> {
    let tape = EventTape::read_from_path(&path)
        .with_context(|| format!("reading event tape {}", path.display()))?;

    println!("Tape: {}", path.display());
    println!("  schema version: {}", tape.schema_version);
    println!("  entries: {}", tape.entries.len());
    if let Some(last) = tape.entries.last() {
        println!("  span: {} ms", last.at_ms);
    }
    for (kind, count) in tape.message_counts() {
        println!("  {kind}: {count}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hostnames_get_https() {
        assert_eq!(
            validate_url("example.com").unwrap(),
            "https://example.com"
        );
        assert_eq!(
            validate_url("http://example.com/a/b").unwrap(),
            "http://example.com/a/b"
        );
    }

    #[test]
    fn localhost_and_ports_are_accepted() {
        assert!(validate_url("localhost:3000").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/app").is_ok());
    }

    #[test]
    fn garbage_urls_are_rejected() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https://").is_err());
    }

    #[test]
    fn names_derive_from_host_and_path() {
        assert_eq!(
            testcase_name_from_url("https://www.example.com/login"),
            "example.com login"
        );
        assert_eq!(
            testcase_name_from_url("https://example.com/"),
            "example.com"
        );
    }

    #[test]
    fn cli_parses_record_with_tape() {
        let cli = Cli::try_parse_from([
            "casetape", "record", "example.com", "--tape", "events.jsonl", "-b", "firefox",
        ])
        .unwrap();
        match cli.command {
            Command::Record { browser, tape, .. } => {
                assert_eq!(browser, BrowserKind::Firefox);
                assert_eq!(tape.unwrap(), PathBuf::from("events.jsonl"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
