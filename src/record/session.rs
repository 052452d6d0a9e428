//! Recording session state machine and accumulated session state.
//!
//! Lifecycle: `Idle → Recording → Exporting → Idle`. Start clears every
//! accumulated buffer; stop freezes the step sequence; both are safe to
//! call in any state.

use chrono::{DateTime, Utc};

use crate::model::{ConsoleEvent, NetworkEvent, PageFault, Step, TestCase, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Exporting,
}

/// Session-level metadata fixed at session creation.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub name: String,
    pub start_url: String,
    pub browser: String,
    pub viewport: Viewport,
    pub user_agent: String,
}

/// Process-wide mutable recording state. Owned by the recorder loop and
/// passed explicitly; there is no ambient singleton.
pub struct RecordingSession {
    meta: SessionMeta,
    state: RecordingState,
    steps: Vec<Step>,
    console_log: Vec<ConsoleEvent>,
    network_log: Vec<NetworkEvent>,
    faults: Vec<PageFault>,
    overflow_network: Vec<NetworkEvent>,
    overflow_console: Vec<ConsoleEvent>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    pub fn new(meta: SessionMeta) -> Self {
        Self {
            meta,
            state: RecordingState::Idle,
            steps: Vec::new(),
            console_log: Vec::new(),
            network_log: Vec::new(),
            faults: Vec::new(),
            overflow_network: Vec::new(),
            overflow_console: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// `Idle → Recording`. Clears all accumulated steps, logs, and overflow
    /// and records the session start time. No-op in any other state.
    pub fn start(&mut self) -> bool {
        if self.state != RecordingState::Idle {
            tracing::debug!(state = ?self.state, "start signal ignored");
            return false;
        }
        self.state = RecordingState::Recording;
        self.steps.clear();
        self.console_log.clear();
        self.network_log.clear();
        self.faults.clear();
        self.overflow_network.clear();
        self.overflow_console.clear();
        self.started_at = Some(Utc::now());
        self.ended_at = None;
        true
    }

    /// `Recording → Exporting`. Records the end time and freezes the step
    /// sequence. Idempotent: a repeated stop, or a stop while idle, does
    /// nothing and reports false.
    pub fn stop(&mut self) -> bool {
        if self.state != RecordingState::Recording {
            tracing::debug!(state = ?self.state, "stop signal ignored");
            return false;
        }
        self.state = RecordingState::Exporting;
        self.ended_at = Some(Utc::now());
        true
    }

    /// `Exporting → Idle`. Clears all buffers after exporters have run (or
    /// were skipped).
    pub fn finish_export(&mut self) {
        if self.state != RecordingState::Exporting {
            return;
        }
        self.state = RecordingState::Idle;
        self.steps.clear();
        self.console_log.clear();
        self.network_log.clear();
        self.faults.clear();
        self.overflow_network.clear();
        self.overflow_console.clear();
    }

    /// Sequence number the next accepted step will get.
    pub fn next_sequence(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn log_console(&mut self, event: ConsoleEvent) {
        self.console_log.push(event);
    }

    pub fn log_network(&mut self, event: NetworkEvent) {
        self.network_log.push(event);
    }

    pub fn log_fault(&mut self, fault: PageFault) {
        self.faults.push(fault);
    }

    /// Events left in the last open window, or settling after stop, end up
    /// here rather than being lost.
    pub fn push_overflow(&mut self, network: Vec<NetworkEvent>, console: Vec<ConsoleEvent>) {
        self.overflow_network.extend(network);
        self.overflow_console.extend(console);
    }

    pub fn push_overflow_network(&mut self, event: NetworkEvent) {
        self.overflow_network.push(event);
    }

    /// Build the immutable export snapshot. None when nothing was recorded:
    /// a zero-step session skips export entirely.
    pub fn freeze(&self) -> Option<TestCase> {
        if self.steps.is_empty() {
            return None;
        }

        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let duration = self
            .ended_at
            .map(|end| (end - started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        Some(TestCase {
            id: TestCase::new_id(),
            name: self.meta.name.clone(),
            created_at: started_at,
            start_url: self.meta.start_url.clone(),
            browser: self.meta.browser.clone(),
            viewport: self.meta.viewport,
            user_agent: self.meta.user_agent.clone(),
            steps: self.steps.clone(),
            console_events: self.console_log.clone(),
            network_events: self.network_log.clone(),
            page_faults: self.faults.clone(),
            overflow_network_events: self.overflow_network.clone(),
            overflow_console_events: self.overflow_console.clone(),
            total_duration_secs: duration,
            total_steps: self.steps.len() as u32,
        })
    }
}
