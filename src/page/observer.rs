//! Capture-phase event observer.
//!
//! Sees raw document events before page handlers can stop propagation,
//! classifies them into [`RawActionEvent`]s, debounces noisy input streams,
//! and forwards the result across the host boundary. Interactions with the
//! recorder's own control surface are excluded by ancestry check.
//!
//! A full page navigation tears down all in-page state, so installation is
//! guarded by a sentinel and [`PageObserver::handle_navigation`] resets it
//! (and cancels any pending debounce timers) for re-injection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::{ActionKind, ElementAttributes, ElementDescriptor, RawActionEvent};
use crate::page::addressor;
use crate::page::dom::{Document, NodeId};
use crate::util::text::truncate_chars;

/// Root id of the recorder's own on-page control surface.
pub const CONTROL_PANEL_ID: &str = "__casetape_panel__";

/// Quiet period before a debounced input event is committed.
pub const INPUT_DEBOUNCE_MS: u64 = 500;

/// Keys forwarded as keypress actions. Everything else is noise.
const SIGNIFICANT_KEYS: &[&str] = &["Enter", "Escape", "Tab"];

/// Cap applied to captured visible text.
const VISIBLE_TEXT_CAP: usize = 100;

/// Raw document events as delivered by the capture phase.
#[derive(Debug, Clone)]
pub enum DomEvent {
    Click { node: NodeId, x: f64, y: f64 },
    DblClick { node: NodeId, x: f64, y: f64 },
    Input { node: NodeId, value: String },
    Change { node: NodeId },
    KeyDown { node: NodeId, key: String },
}

impl DomEvent {
    fn node(&self) -> NodeId {
        match self {
            DomEvent::Click { node, .. }
            | DomEvent::DblClick { node, .. }
            | DomEvent::Input { node, .. }
            | DomEvent::Change { node }
            | DomEvent::KeyDown { node, .. } => *node,
        }
    }
}

struct PendingInput {
    event: RawActionEvent,
    timer: JoinHandle<()>,
}

/// In-page observer feeding normalized actions into the host boundary.
pub struct PageObserver {
    tx: mpsc::Sender<RawActionEvent>,
    installed: bool,
    debounce: Duration,
    pending: Arc<Mutex<HashMap<String, PendingInput>>>,
}

impl PageObserver {
    pub fn new(tx: mpsc::Sender<RawActionEvent>) -> Self {
        Self::with_debounce(tx, Duration::from_millis(INPUT_DEBOUNCE_MS))
    }

    pub fn with_debounce(tx: mpsc::Sender<RawActionEvent>, debounce: Duration) -> Self {
        Self {
            tx,
            installed: false,
            debounce,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attach the observer. Idempotent: a second install on the same page
    /// state is a no-op, mirroring the injected-script sentinel.
    pub fn install(&mut self) -> bool {
        if self.installed {
            tracing::debug!("observer already installed, skipping");
            return false;
        }
        self.installed = true;
        true
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// A navigation destroyed all in-page state: drop the sentinel and
    /// cancel pending debounce timers so the observer can be re-installed.
    pub fn handle_navigation(&mut self) {
        self.installed = false;
        let mut pending = self.pending.lock();
        for (_, entry) in pending.drain() {
            entry.timer.abort();
        }
    }

    /// Classify and forward one raw document event.
    pub async fn handle_event(&self, doc: &Document, event: DomEvent) {
        if !self.installed {
            return;
        }
        if doc.is_within_id(event.node(), CONTROL_PANEL_ID) {
            return;
        }

        match event {
            DomEvent::Click { node, x, y } => {
                let mut event = action(doc, node, ActionKind::Click);
                event.coordinates = Some((x, y));
                self.forward(event).await;
            }
            DomEvent::DblClick { node, x, y } => {
                let mut event = action(doc, node, ActionKind::Dblclick);
                event.coordinates = Some((x, y));
                self.forward(event).await;
            }
            DomEvent::Input { node, value } => {
                self.debounce_input(doc, node, value);
            }
            DomEvent::Change { node } => {
                if let Some(event) = classify_change(doc, node) {
                    self.forward(event).await;
                }
            }
            DomEvent::KeyDown { node, key } => {
                if SIGNIFICANT_KEYS.contains(&key.as_str()) {
                    let mut event = action(doc, node, ActionKind::Keypress);
                    event.key = Some(key);
                    self.forward(event).await;
                }
            }
        }
    }

    /// Reset the per-field timer on every keystroke; only the value present
    /// when the timer finally fires is forwarded. Keyed by selector so
    /// concurrent edits on different fields do not interfere.
    fn debounce_input(&self, doc: &Document, node: NodeId, value: String) {
        let selector = addressor::selector(doc, node);
        let mut event = action(doc, node, ActionKind::Input);
        event.value = Some(value);

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.remove(&selector) {
            previous.timer.abort();
        }

        let key = selector.clone();
        let map = Arc::clone(&self.pending);
        let tx = self.tx.clone();
        let delay = self.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let committed = map.lock().remove(&key);
            if let Some(entry) = committed {
                if tx.send(entry.event).await.is_err() {
                    tracing::debug!(selector = %key, "boundary unreachable, input event dropped");
                }
            }
        });

        pending.insert(selector, PendingInput { event, timer });
    }

    /// Forwarding failures must never propagate into the page's own event
    /// pipeline; log and swallow.
    async fn forward(&self, event: RawActionEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("boundary unreachable, action event dropped");
        }
    }
}

/// Snapshot a node into an immutable [`ElementDescriptor`].
pub fn snapshot_element(doc: &Document, node: NodeId) -> ElementDescriptor {
    let (selector, structural_path) = addressor::locate(doc, node);
    let data = doc.node(node);

    let text = doc.visible_text(node);
    let text = truncate_chars(text.trim(), VISIBLE_TEXT_CAP);
    let visible_text = (!text.is_empty()).then_some(text);

    let attr = |name: &str| doc.attribute(node, name).map(str::to_string);

    ElementDescriptor {
        selector,
        structural_path,
        tag_name: data.tag.clone(),
        visible_text,
        placeholder: attr("placeholder"),
        attributes: ElementAttributes {
            id: attr("id"),
            name: attr("name"),
            r#type: attr("type"),
            href: attr("href"),
            class: attr("class"),
        },
        bounding_box: data.bounding_box,
    }
}

fn action(doc: &Document, node: NodeId, kind: ActionKind) -> RawActionEvent {
    RawActionEvent {
        kind,
        element: snapshot_element(doc, node),
        value: None,
        value_label: None,
        key: None,
        coordinates: None,
        occurred_at: Utc::now(),
    }
}

/// Re-classify a change event by element semantics. Change on anything that
/// is not a checkbox, radio, or select is suppressed: the debounced input
/// path already covers it and a second step would be a duplicate.
fn classify_change(doc: &Document, node: NodeId) -> Option<RawActionEvent> {
    let tag = doc.node(node).tag.clone();
    let input_type = doc.attribute(node, "type").unwrap_or_default();

    if input_type == "checkbox" {
        let checked = doc.attribute(node, "checked").is_some();
        let kind = if checked {
            ActionKind::Check
        } else {
            ActionKind::Uncheck
        };
        return Some(action(doc, node, kind));
    }
    if input_type == "radio" {
        return Some(action(doc, node, ActionKind::Check));
    }
    if tag == "select" {
        let value = doc.attribute(node, "value").unwrap_or_default().to_string();
        let label = doc.selected_option_text(node);
        let mut event = action(doc, node, ActionKind::Select);
        event.value = Some(value);
        event.value_label = label;
        return Some(event);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::dom::Node;
    use tokio::sync::mpsc;

    fn observer(debounce_ms: u64) -> (PageObserver, mpsc::Receiver<RawActionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let mut obs = PageObserver::with_debounce(tx, Duration::from_millis(debounce_ms));
        obs.install();
        (obs, rx)
    }

    #[tokio::test]
    async fn click_is_forwarded_immediately_with_coordinates() {
        let mut doc = Document::new();
        let button = doc.append(
            doc.root(),
            Node::tag("button").attr("id", "submit").text("Submit"),
        );
        let (obs, mut rx) = observer(500);

        obs.handle_event(
            &doc,
            DomEvent::Click {
                node: button,
                x: 10.0,
                y: 20.0,
            },
        )
        .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ActionKind::Click);
        assert_eq!(event.element.selector, "#submit");
        assert_eq!(event.coordinates, Some((10.0, 20.0)));
        assert_eq!(event.element.visible_text.as_deref(), Some("Submit"));
    }

    #[tokio::test]
    async fn control_panel_interactions_are_excluded() {
        let mut doc = Document::new();
        let panel = doc.append(doc.root(), Node::tag("div").attr("id", CONTROL_PANEL_ID));
        let button = doc.append(panel, Node::tag("button").text("Stop"));
        let (obs, mut rx) = observer(500);

        obs.handle_event(
            &doc,
            DomEvent::Click {
                node: button,
                x: 0.0,
                y: 0.0,
            },
        )
        .await;

        drop(obs);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn input_is_debounced_to_the_last_value() {
        let mut doc = Document::new();
        let field = doc.append(doc.root(), Node::tag("input").attr("id", "email"));
        let (obs, mut rx) = observer(50);

        for value in ["a", "ab", "abc"] {
            obs.handle_event(
                &doc,
                DomEvent::Input {
                    node: field,
                    value: value.to_string(),
                },
            )
            .await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(120)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ActionKind::Input);
        assert_eq!(event.value.as_deref(), Some("abc"));

        // No second event pending.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn interleaved_fields_debounce_independently() {
        let mut doc = Document::new();
        let a = doc.append(doc.root(), Node::tag("input").attr("id", "a"));
        let b = doc.append(doc.root(), Node::tag("input").attr("id", "b"));
        let (obs, mut rx) = observer(50);

        obs.handle_event(&doc, DomEvent::Input { node: a, value: "a".into() }).await;
        obs.handle_event(&doc, DomEvent::Input { node: a, value: "ab".into() }).await;
        obs.handle_event(&doc, DomEvent::Input { node: b, value: "c".into() }).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.value.as_deref(), Some("ab"));
        assert_eq!(first.element.selector, "#a");
        assert_eq!(second.value.as_deref(), Some("c"));
        assert_eq!(second.element.selector, "#b");
    }

    #[tokio::test]
    async fn change_reclassifies_checkbox_radio_and_select() {
        let mut doc = Document::new();
        let checkbox = doc.append(
            doc.root(),
            Node::tag("input").attr("type", "checkbox").attr("id", "opt"),
        );
        let radio = doc.append(
            doc.root(),
            Node::tag("input").attr("type", "radio").attr("id", "pick"),
        );
        let select = doc.append(
            doc.root(),
            Node::tag("select").attr("id", "country").attr("value", "us"),
        );
        doc.append(select, Node::tag("option").attr("value", "us").text("United States"));

        let (obs, mut rx) = observer(500);

        doc.set_attribute(checkbox, "checked", "true");
        obs.handle_event(&doc, DomEvent::Change { node: checkbox }).await;
        assert_eq!(rx.recv().await.unwrap().kind, ActionKind::Check);

        doc.remove_attribute(checkbox, "checked");
        obs.handle_event(&doc, DomEvent::Change { node: checkbox }).await;
        assert_eq!(rx.recv().await.unwrap().kind, ActionKind::Uncheck);

        obs.handle_event(&doc, DomEvent::Change { node: radio }).await;
        assert_eq!(rx.recv().await.unwrap().kind, ActionKind::Check);

        obs.handle_event(&doc, DomEvent::Change { node: select }).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ActionKind::Select);
        assert_eq!(event.value.as_deref(), Some("us"));
        assert_eq!(event.value_label.as_deref(), Some("United States"));
    }

    #[tokio::test]
    async fn change_on_text_input_is_suppressed() {
        let mut doc = Document::new();
        let field = doc.append(doc.root(), Node::tag("input").attr("type", "text"));
        let (obs, mut rx) = observer(500);

        obs.handle_event(&doc, DomEvent::Change { node: field }).await;

        drop(obs);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn only_significant_keys_are_forwarded() {
        let mut doc = Document::new();
        let field = doc.append(doc.root(), Node::tag("input").attr("id", "q"));
        let (obs, mut rx) = observer(500);

        for key in ["a", "Shift", "Enter", "x", "Escape", "Tab"] {
            obs.handle_event(
                &doc,
                DomEvent::KeyDown {
                    node: field,
                    key: key.to_string(),
                },
            )
            .await;
        }
        drop(obs);

        let mut keys = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.kind, ActionKind::Keypress);
            keys.push(event.key.unwrap());
        }
        assert_eq!(keys, vec!["Enter", "Escape", "Tab"]);
    }

    #[tokio::test]
    async fn double_install_is_guarded_and_navigation_resets() {
        let (tx, _rx) = mpsc::channel(8);
        let mut obs = PageObserver::new(tx);
        assert!(obs.install());
        assert!(!obs.install());
        obs.handle_navigation();
        assert!(!obs.is_installed());
        assert!(obs.install());
    }

    #[tokio::test]
    async fn navigation_cancels_pending_debounce() {
        let mut doc = Document::new();
        let field = doc.append(doc.root(), Node::tag("input").attr("id", "email"));
        let (mut obs, mut rx) = observer(50);

        obs.handle_event(
            &doc,
            DomEvent::Input {
                node: field,
                value: "half-typed".into(),
            },
        )
        .await;
        obs.handle_navigation();
        tokio::time::sleep(Duration::from_millis(120)).await;

        drop(obs);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn events_before_install_are_ignored() {
        let mut doc = Document::new();
        let button = doc.append(doc.root(), Node::tag("button"));
        let (tx, mut rx) = mpsc::channel(8);
        let obs = PageObserver::new(tx);

        obs.handle_event(
            &doc,
            DomEvent::Click {
                node: button,
                x: 0.0,
                y: 0.0,
            },
        )
        .await;

        drop(obs);
        assert!(rx.recv().await.is_none());
    }
}
