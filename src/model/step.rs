use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::element::ElementDescriptor;
use crate::model::events::{ActionKind, ConsoleEvent, NetworkEvent, PageFault};

/// Opaque handle to a captured screenshot, produced by the screenshot
/// collaborator. The engine never looks inside it; exporters resolve it
/// relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenshotRef(pub PathBuf);

/// Browser viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// One recorded user action plus everything attributed to it.
///
/// Minted exactly once by the step assembler, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// 1-based, contiguous across the session.
    pub sequence_number: u32,
    pub occurred_at: DateTime<Utc>,
    pub action_kind: ActionKind,
    /// Absent for pure navigation/wait steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ScreenshotRef>,
    /// Network events whose lifecycle fell inside this step's window.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_events: Vec<NetworkEvent>,
    /// Console events observed inside this step's window.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console_events: Vec<ConsoleEvent>,
    pub short_description: String,
    pub detailed_description: String,
}

/// Complete recorded session: the frozen step sequence plus session-level
/// logs and summary metadata. Handed to each exporter as an immutable
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,

    pub start_url: String,
    pub browser: String,
    pub viewport: Viewport,
    pub user_agent: String,

    pub steps: Vec<Step>,

    /// Full-session timeline, regardless of step attribution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console_events: Vec<ConsoleEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_events: Vec<NetworkEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_faults: Vec<PageFault>,

    /// Events whose async completion landed after the last step boundary
    /// (including after recording stopped). Retained, never dropped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overflow_network_events: Vec<NetworkEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overflow_console_events: Vec<ConsoleEvent>,

    pub total_duration_secs: f64,
    pub total_steps: u32,
}

impl TestCase {
    /// Mint a fresh test-case id: `tc_` plus 8 hex chars of a v4 uuid.
    pub fn new_id() -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("tc_{}", &uuid[..8])
    }
}
