use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::element::ElementDescriptor;

/// Classified user action kinds emitted by the page observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Dblclick,
    Input,
    Select,
    Check,
    Uncheck,
    Keypress,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Dblclick => "dblclick",
            ActionKind::Input => "input",
            ActionKind::Select => "select",
            ActionKind::Check => "check",
            ActionKind::Uncheck => "uncheck",
            ActionKind::Keypress => "keypress",
        }
    }
}

/// Normalized action event crossing the page/host boundary.
///
/// Transient: absorbed into a [`crate::model::Step`] by the assembler and
/// then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActionEvent {
    pub kind: ActionKind,
    pub element: ElementDescriptor,
    /// Committed value for input/select actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Display text of the chosen option for select actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_label: Option<String>,
    /// Key name for keypress actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Viewport cursor coordinates for click/dblclick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<(f64, f64)>,
    pub occurred_at: DateTime<Utc>,
}

/// One observed request/response/failure cycle.
///
/// Keyed by URL while in flight: at most one request per distinct URL may be
/// outstanding at a time. A second request to the same URL before the first
/// resolves overwrites the pending entry. Known limitation, kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEvent {
    pub method: String,
    pub url: String,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_headers: BTreeMap<String, String>,
    /// Outgoing body, captured only for state-changing methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    /// Body preview, populated asynchronously for API calls and capped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    /// Failure message. Mutually exclusive with `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetworkEvent {
    /// API calls get asynchronous response-body capture; everything else is
    /// buffered as soon as the response headers arrive.
    pub fn is_api_call(&self) -> bool {
        matches!(self.resource_type.as_str(), "xhr" | "fetch")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Trace,
}

impl ConsoleLevel {
    /// Map a browser console message type onto our levels. Unknown types
    /// fall back to `Log`.
    pub fn from_browser_type(raw: &str) -> Self {
        match raw {
            "info" => ConsoleLevel::Info,
            "warn" | "warning" => ConsoleLevel::Warn,
            "error" => ConsoleLevel::Error,
            "debug" => ConsoleLevel::Debug,
            "trace" => ConsoleLevel::Trace,
            _ => ConsoleLevel::Log,
        }
    }
}

/// Maximum number of console arguments retained per entry.
pub const CONSOLE_ARGS_CAP: usize = 5;

/// Browser console entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEvent {
    pub level: ConsoleLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ConsoleEvent {
    /// Truncate `args` to the retention cap, in place.
    pub fn cap_args(&mut self) {
        self.args.truncate(CONSOLE_ARGS_CAP);
    }
}

/// Uncaught script error on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFault {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// A network request as observed at start time, before any response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Outgoing body, present only for state-changing methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestRecord {
    /// Whether the method may carry a request body worth capturing.
    pub fn is_state_changing(&self) -> bool {
        matches!(self.method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
    }
}

/// A network response as observed when headers arrive. The body may follow
/// asynchronously; tape-driven runs can carry it inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub url: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
