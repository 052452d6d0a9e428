//! Page/host boundary protocol and its JSONL persistence.
//!
//! [`PageMessage`] is the complete set of messages crossing the boundary:
//! normalized actions from the observer, console/network/fault records from
//! the browser driver, navigation notices, and the start/stop control
//! signals. An **event tape** is a JSONL file holding a schema-versioned
//! header followed by timestamped messages; the CLI can drive an entire
//! recording session from one, and integration tests use them to exercise
//! the pipeline without a browser.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{ConsoleEvent, PageFault, RawActionEvent, RequestRecord, ResponseRecord};

pub const TAPE_SCHEMA_VERSION: u32 = 1;

/// One message crossing the page/host boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageMessage {
    /// Explicit start signal (control panel or driver).
    Start,
    /// Explicit stop signal. Idempotent on the host side.
    Stop,
    /// Full page navigation: in-page state is gone, observer needs
    /// re-injection.
    Navigated { url: String },
    Action { event: RawActionEvent },
    Console { event: ConsoleEvent },
    Fault { event: PageFault },
    Request { request: RequestRecord },
    Response { response: ResponseRecord },
    RequestFailed { url: String, error: String },
}

impl PageMessage {
    /// Short kind name, used by `inspect` and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PageMessage::Start => "start",
            PageMessage::Stop => "stop",
            PageMessage::Navigated { .. } => "navigated",
            PageMessage::Action { .. } => "action",
            PageMessage::Console { .. } => "console",
            PageMessage::Fault { .. } => "fault",
            PageMessage::Request { .. } => "request",
            PageMessage::Response { .. } => "response",
            PageMessage::RequestFailed { .. } => "request_failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapeEntry {
    /// Milliseconds since the tape was started.
    pub at_ms: u64,
    pub message: PageMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TapeJsonlLine {
    Header {
        schema_version: u32,
        created_at_ms: u64,
    },
    Entry {
        entry: TapeEntry,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TapeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed tape line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("tape has no header line")]
    MissingHeader,

    #[error("unsupported tape schema version {0}")]
    UnsupportedSchema(u32),
}

/// A fully loaded event tape.
#[derive(Debug, Clone)]
pub struct EventTape {
    pub schema_version: u32,
    pub created_at_ms: u64,
    pub entries: Vec<TapeEntry>,
}

impl EventTape {
    pub fn read_from_path(path: &Path) -> Result<Self, TapeError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut header: Option<(u32, u64)> = None;
        let mut entries = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: TapeJsonlLine = serde_json::from_str(&line)
                .map_err(|source| TapeError::Malformed {
                    line: idx + 1,
                    source,
                })?;
            match parsed {
                TapeJsonlLine::Header {
                    schema_version,
                    created_at_ms,
                } => {
                    if schema_version > TAPE_SCHEMA_VERSION {
                        return Err(TapeError::UnsupportedSchema(schema_version));
                    }
                    header = Some((schema_version, created_at_ms));
                }
                TapeJsonlLine::Entry { entry } => {
                    if header.is_none() {
                        return Err(TapeError::MissingHeader);
                    }
                    entries.push(entry);
                }
            }
        }

        let (schema_version, created_at_ms) = header.ok_or(TapeError::MissingHeader)?;
        Ok(Self {
            schema_version,
            created_at_ms,
            entries,
        })
    }

    /// Per-message-kind counts, for `inspect`.
    pub fn message_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for entry in &self.entries {
            let kind = entry.message.kind();
            match counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }
}

/// Append-only tape writer. Entry timestamps are offsets from creation.
pub struct TapeWriter {
    writer: Mutex<BufWriter<File>>,
    started: Instant,
}

impl TapeWriter {
    pub fn create(path: &Path) -> Result<Self, TapeError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let header = TapeJsonlLine::Header {
            schema_version: TAPE_SCHEMA_VERSION,
            created_at_ms: now_ms(),
        };
        writeln!(
            writer,
            "{}",
            serde_json::to_string(&header).map_err(io::Error::other)?
        )?;
        writer.flush()?;
        Ok(Self {
            writer: Mutex::new(writer),
            started: Instant::now(),
        })
    }

    pub fn append(&self, message: PageMessage) -> Result<(), TapeError> {
        self.append_at(self.started.elapsed().as_millis() as u64, message)
    }

    pub fn append_at(&self, at_ms: u64, message: PageMessage) -> Result<(), TapeError> {
        let line = TapeJsonlLine::Entry {
            entry: TapeEntry { at_ms, message },
        };
        let mut writer = self.writer.lock();
        writeln!(
            writer,
            "{}",
            serde_json::to_string(&line).map_err(io::Error::other)?
        )?;
        writer.flush()?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    use crate::model::{ConsoleLevel, ElementAttributes, ElementDescriptor};

    fn click_message() -> PageMessage {
        PageMessage::Action {
            event: RawActionEvent {
                kind: crate::model::ActionKind::Click,
                element: ElementDescriptor {
                    selector: "#submit".to_string(),
                    structural_path: "//*[@id=\"submit\"]".to_string(),
                    tag_name: "button".to_string(),
                    visible_text: Some("Submit".to_string()),
                    placeholder: None,
                    attributes: ElementAttributes::default(),
                    bounding_box: Default::default(),
                },
                value: None,
                value_label: None,
                key: None,
                coordinates: Some((4.0, 8.0)),
                occurred_at: Utc::now(),
            },
        }
    }

    #[test]
    fn tape_roundtrips_header_and_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let writer = TapeWriter::create(&path).unwrap();
        writer.append_at(0, PageMessage::Start).unwrap();
        writer.append_at(5, click_message()).unwrap();
        writer
            .append_at(
                9,
                PageMessage::Console {
                    event: ConsoleEvent {
                        level: ConsoleLevel::Warn,
                        message: "careful".to_string(),
                        source: None,
                        args: Vec::new(),
                        occurred_at: Utc::now(),
                    },
                },
            )
            .unwrap();
        writer.append_at(20, PageMessage::Stop).unwrap();
        drop(writer);

        let tape = EventTape::read_from_path(&path).unwrap();
        assert_eq!(tape.schema_version, TAPE_SCHEMA_VERSION);
        assert_eq!(tape.entries.len(), 4);
        assert_eq!(tape.entries[1].at_ms, 5);
        assert!(matches!(
            tape.entries[1].message,
            PageMessage::Action { .. }
        ));

        let counts = tape.message_counts();
        assert!(counts.contains(&("start", 1)));
        assert!(counts.contains(&("console", 1)));
    }

    #[test]
    fn missing_header_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("headless.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"entry\",\"entry\":{\"at_ms\":0,\"message\":{\"type\":\"start\"}}}\n",
        )
        .unwrap();
        assert!(matches!(
            EventTape::read_from_path(&path),
            Err(TapeError::MissingHeader)
        ));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jsonl");
        let writer = TapeWriter::create(&path).unwrap();
        writer.append_at(0, PageMessage::Start).unwrap();
        drop(writer);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        std::fs::write(&path, content).unwrap();

        match EventTape::read_from_path(&path) {
            Err(TapeError::Malformed { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn future_schema_versions_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"header\",\"schema_version\":99,\"created_at_ms\":0}\n",
        )
        .unwrap();
        assert!(matches!(
            EventTape::read_from_path(&path),
            Err(TapeError::UnsupportedSchema(99))
        ));
    }
}
