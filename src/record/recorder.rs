//! The recorder control loop.
//!
//! All session mutation happens in one task consuming a [`RecorderMsg`]
//! channel. Async work (response-body capture) is spawned off and reports
//! back through the same channel, so settled events land in whichever step
//! window is open at landing time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::{NetworkEvent, RawActionEvent, Step, TestCase};
use crate::record::correlate::{
    body_preview, CorrelationBuffer, ResponseBodyFetcher, ResponseOutcome,
};
use crate::record::describe::{detailed_description, short_description};
use crate::record::screenshot::Screenshotter;
use crate::record::session::{RecordingSession, SessionMeta};
use crate::tape::PageMessage;

const CHANNEL_CAPACITY: usize = 256;

/// Input to the recorder loop: boundary messages plus internal completions.
#[derive(Debug)]
pub enum RecorderMsg {
    Page(PageMessage),
    /// A spawned body capture finished; the event is ready to land.
    NetworkSettled(NetworkEvent),
}

/// Cloneable sender half handed to drivers, observers, and tape feeders.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RecorderMsg>,
}

impl RecorderHandle {
    /// Deliver a boundary message. Returns false once the recorder loop has
    /// exited.
    pub async fn send(&self, message: PageMessage) -> bool {
        self.tx.send(RecorderMsg::Page(message)).await.is_ok()
    }

    /// Forward normalized action events from a page observer channel into
    /// the recorder until either side closes.
    pub fn bridge_actions(&self, mut actions: mpsc::Receiver<RawActionEvent>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(event) = actions.recv().await {
                if !handle.send(PageMessage::Action { event }).await {
                    break;
                }
            }
        })
    }
}

pub struct Recorder {
    session: RecordingSession,
    buffer: CorrelationBuffer,
    screenshotter: Arc<dyn Screenshotter>,
    body_fetcher: Arc<dyn ResponseBodyFetcher>,
    /// Weak so the loop still drains to completion once every external
    /// handle is dropped; body-capture tasks upgrade it while they run.
    tx: mpsc::WeakSender<RecorderMsg>,
    rx: mpsc::Receiver<RecorderMsg>,
    outstanding_bodies: usize,
    stop_requested: bool,
}

impl Recorder {
    pub fn new(
        meta: SessionMeta,
        screenshotter: Arc<dyn Screenshotter>,
        body_fetcher: Arc<dyn ResponseBodyFetcher>,
    ) -> (Self, RecorderHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = RecorderHandle { tx: tx.clone() };
        let recorder = Self {
            session: RecordingSession::new(meta),
            buffer: CorrelationBuffer::new(),
            screenshotter,
            body_fetcher,
            tx: tx.downgrade(),
            rx,
            outstanding_bodies: 0,
            stop_requested: false,
        };
        (recorder, handle)
    }

    /// Consume messages until a stop signal has been seen and every spawned
    /// body capture has settled, then freeze and return the test case.
    /// Returns None for a session with no steps.
    pub async fn run(mut self) -> Option<TestCase> {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                RecorderMsg::Page(message) => self.on_page_message(message).await,
                RecorderMsg::NetworkSettled(event) => self.on_settled(event),
            }
            if self.stop_requested && self.outstanding_bodies == 0 {
                break;
            }
        }
        self.finish()
    }

    async fn on_page_message(&mut self, message: PageMessage) {
        match message {
            PageMessage::Start => {
                if self.session.start() {
                    tracing::info!("recording started");
                }
            }
            PageMessage::Stop => {
                self.stop_requested = true;
                if self.session.stop() {
                    let (network, console) = self.buffer.drain_window();
                    self.session.push_overflow(network, console);
                    tracing::info!(
                        steps = self.session.step_count(),
                        outstanding = self.outstanding_bodies,
                        "recording stopped"
                    );
                }
            }
            PageMessage::Navigated { url } => {
                tracing::info!(%url, "page navigated");
            }
            PageMessage::Action { event } => {
                if !self.session.is_recording() {
                    tracing::debug!(kind = event.kind.as_str(), "action outside recording, ignored");
                    return;
                }
                self.assemble_step(event).await;
            }
            PageMessage::Console { mut event } => {
                if !self.session.is_recording() {
                    return;
                }
                event.cap_args();
                self.buffer.on_console(event.clone());
                self.session.log_console(event);
            }
            PageMessage::Fault { event } => {
                if !self.session.is_recording() {
                    return;
                }
                tracing::warn!(message = %event.message, "page fault");
                self.session.log_fault(event);
            }
            PageMessage::Request { request } => {
                if !self.session.is_recording() {
                    return;
                }
                self.buffer.on_request(request);
            }
            PageMessage::Response { response } => {
                if !self.session.is_recording() {
                    return;
                }
                match self.buffer.on_response(response) {
                    ResponseOutcome::Buffered(event) => self.session.log_network(event),
                    ResponseOutcome::NeedsBody { event, inline_body } => {
                        self.spawn_body_capture(event, inline_body);
                    }
                    ResponseOutcome::Orphaned => {}
                }
            }
            PageMessage::RequestFailed { url, error } => {
                if !self.session.is_recording() {
                    return;
                }
                if let Some(event) = self.buffer.on_request_failed(&url, error) {
                    self.session.log_network(event);
                }
            }
        }
    }

    /// Turn a normalized action into a numbered step, attaching everything
    /// the correlation buffer accumulated since the previous step.
    async fn assemble_step(&mut self, event: RawActionEvent) {
        if !event.element.is_well_formed() {
            tracing::warn!(
                kind = event.kind.as_str(),
                selector = %event.element.selector,
                "dropping action with malformed element payload"
            );
            return;
        }

        let sequence_number = self.session.next_sequence();
        let screenshot = match self
            .screenshotter
            .capture(sequence_number, event.kind, Some(&event.element))
            .await
        {
            Ok(shot) => shot,
            Err(e) => {
                tracing::warn!(step = sequence_number, error = %e, "screenshot capture failed");
                None
            }
        };

        let (network_events, console_events) = self.buffer.drain_window();
        let step = Step {
            sequence_number,
            occurred_at: event.occurred_at,
            action_kind: event.kind,
            element: Some(event.element.clone()),
            input_value: event.value.clone(),
            key: event.key.clone(),
            screenshot,
            network_events,
            console_events,
            short_description: short_description(&event),
            detailed_description: detailed_description(&event),
        };

        tracing::info!(
            step = step.sequence_number,
            action = event.kind.as_str(),
            "{}",
            step.short_description
        );
        self.session.push_step(step);
    }

    fn spawn_body_capture(&mut self, mut event: NetworkEvent, inline_body: Option<String>) {
        let Some(tx) = self.tx.upgrade() else {
            // Every handle is gone and the loop is draining; nothing can
            // report back, so settle with the inline body if one came along.
            if let Some(body) = inline_body {
                event.response_body = Some(body_preview(body.as_bytes()));
            }
            self.on_settled(event);
            return;
        };
        self.outstanding_bodies += 1;
        let fetcher = Arc::clone(&self.body_fetcher);
        tokio::spawn(async move {
            let body = match inline_body {
                Some(body) => body_preview(body.as_bytes()),
                None => match fetcher.fetch(&event.url).await {
                    Ok(bytes) => body_preview(&bytes),
                    Err(e) => format!("[Error capturing body: {e}]"),
                },
            };
            event.response_body = Some(body);
            let _ = tx.send(RecorderMsg::NetworkSettled(event)).await;
        });
    }

    fn on_settled(&mut self, event: NetworkEvent) {
        self.outstanding_bodies = self.outstanding_bodies.saturating_sub(1);
        self.session.log_network(event.clone());
        if self.session.is_recording() {
            self.buffer.append_settled(event);
        } else {
            // Settled after stop: session tail, not any step.
            self.session.push_overflow_network(event);
        }
    }

    fn finish(mut self) -> Option<TestCase> {
        if self.session.stop() {
            tracing::debug!("channel closed without stop signal, stopping session");
        }
        let (network, console) = self.buffer.drain_window();
        self.session.push_overflow(network, console);

        let testcase = self.session.freeze();
        if testcase.is_none() {
            tracing::info!("no steps recorded, nothing to export");
        }
        self.session.finish_export();
        testcase
    }
}
