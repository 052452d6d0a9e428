//! Correlation buffer: tracks in-flight network requests and accumulates
//! the console/network events of the currently open step window.
//!
//! Pending requests are keyed by URL. At most one request per distinct URL
//! can be outstanding; a second request to the same URL before the first
//! resolves overwrites the pending entry. This loses correlation data for
//! duplicate concurrent requests and is kept as a documented limitation.
//!
//! Attribution is wall-clock window membership, not causal tracing: an
//! event whose async completion lands after the triggering step closed is
//! attributed to whichever window is open at landing time.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use crate::model::{ConsoleEvent, NetworkEvent, RequestRecord, ResponseRecord};
use crate::util::text::truncate_chars;

/// Response bodies above this raw size are replaced with a size marker.
pub const RESPONSE_BODY_MAX_BYTES: usize = 50 * 1024;

/// Decoded response bodies are truncated to this many characters.
pub const RESPONSE_BODY_MAX_CHARS: usize = 10_000;

/// Marker identifying the recorder's own injected calls.
const INTERNAL_URL_MARKER: &str = "__casetape";

/// URLs the correlation buffer never tracks: data URIs and the recorder's
/// own injected calls.
pub fn is_synthetic_url(url: &str) -> bool {
    url.starts_with("data:") || url.contains(INTERNAL_URL_MARKER)
}

/// Render a fetched response body into its capped preview form.
pub fn body_preview(bytes: &[u8]) -> String {
    if bytes.len() > RESPONSE_BODY_MAX_BYTES {
        return format!("[Large response, {} bytes]", bytes.len());
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            if text.chars().count() > RESPONSE_BODY_MAX_CHARS {
                format!(
                    "{}\n... (truncated)",
                    truncate_chars(text, RESPONSE_BODY_MAX_CHARS)
                )
            } else {
                text.to_string()
            }
        }
        Err(_) => format!("[Binary data, {} bytes]", bytes.len()),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BodyFetchError(pub String);

/// Collaborator resolving response bodies for API calls. Live drivers hit
/// the browser; tape-driven runs serve inline bodies and never reach this.
#[async_trait]
pub trait ResponseBodyFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BodyFetchError>;
}

/// Fetcher for runs without body access; every fetch fails and the event
/// carries an error marker instead of a preview.
pub struct UnavailableBodyFetcher;

#[async_trait]
impl ResponseBodyFetcher for UnavailableBodyFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, BodyFetchError> {
        Err(BodyFetchError("no body fetcher available".to_string()))
    }
}

/// What the buffer decided about an observed response.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// Non-API resource, appended to the open window immediately. The copy
    /// is for the session-level log.
    Buffered(NetworkEvent),
    /// API call: the event must not land anywhere until its body capture
    /// settles.
    NeedsBody {
        event: NetworkEvent,
        inline_body: Option<String>,
    },
    /// No matching pending request, dropped. Possible event-ordering loss
    /// or duplicate-URL collision.
    Orphaned,
}

#[derive(Default)]
pub struct CorrelationBuffer {
    pending: HashMap<String, NetworkEvent>,
    window_network: Vec<NetworkEvent>,
    window_console: Vec<ConsoleEvent>,
}

impl CorrelationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_console(&mut self, event: ConsoleEvent) {
        self.window_console.push(event);
    }

    /// Register a request start. Returns false for skipped synthetic URLs.
    pub fn on_request(&mut self, request: RequestRecord) -> bool {
        if is_synthetic_url(&request.url) {
            tracing::debug!(url = %request.url, "skipping synthetic request");
            return false;
        }

        let request_body = request
            .is_state_changing()
            .then_some(request.body)
            .flatten();

        let event = NetworkEvent {
            method: request.method,
            url: request.url,
            resource_type: request.resource_type,
            status: None,
            started_at: Utc::now(),
            timing_ms: None,
            request_headers: request.headers,
            response_headers: Default::default(),
            request_body,
            response_body: None,
            error: None,
        };

        if let Some(previous) = self.pending.insert(event.url.clone(), event) {
            tracing::debug!(
                url = %previous.url,
                "second in-flight request to same URL, pending entry overwritten"
            );
        }
        true
    }

    pub fn on_response(&mut self, response: ResponseRecord) -> ResponseOutcome {
        let Some(mut event) = self.pending.remove(&response.url) else {
            tracing::debug!(url = %response.url, "orphaned response, dropping");
            return ResponseOutcome::Orphaned;
        };

        event.status = Some(response.status);
        event.response_headers = response.headers;
        event.timing_ms = response.timing_ms;

        if event.is_api_call() {
            ResponseOutcome::NeedsBody {
                event,
                inline_body: response.body,
            }
        } else {
            self.window_network.push(event.clone());
            ResponseOutcome::Buffered(event)
        }
    }

    /// A request failed. Pops the pending entry, marks it, and appends it to
    /// the open window immediately. Returns a copy for the session log, or
    /// None for an orphan.
    pub fn on_request_failed(&mut self, url: &str, error: String) -> Option<NetworkEvent> {
        let mut event = self.pending.remove(url)?;
        event.error = Some(error);
        self.window_network.push(event.clone());
        Some(event)
    }

    /// A settled body capture lands in whichever window is open now.
    pub fn append_settled(&mut self, event: NetworkEvent) {
        self.window_network.push(event);
    }

    /// Drain the open window wholesale; the buffer is empty afterwards.
    pub fn drain_window(&mut self) -> (Vec<NetworkEvent>, Vec<ConsoleEvent>) {
        (
            std::mem::take(&mut self.window_network),
            std::mem::take(&mut self.window_console),
        )
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(url: &str, method: &str, resource_type: &str) -> RequestRecord {
        RequestRecord {
            method: method.to_string(),
            url: url.to_string(),
            resource_type: resource_type.to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    fn response(url: &str, status: u16) -> ResponseRecord {
        ResponseRecord {
            url: url.to_string(),
            status,
            headers: BTreeMap::new(),
            timing_ms: Some(12.5),
            body: None,
        }
    }

    #[test]
    fn synthetic_urls_are_skipped() {
        let mut buffer = CorrelationBuffer::new();
        assert!(!buffer.on_request(request("data:text/plain,hi", "GET", "other")));
        assert!(!buffer.on_request(request(
            "https://x.test/__casetape/panel",
            "GET",
            "xhr"
        )));
        assert_eq!(buffer.pending_count(), 0);
    }

    #[test]
    fn request_body_captured_only_for_state_changing_methods() {
        let mut buffer = CorrelationBuffer::new();

        let mut post = request("https://x.test/a", "POST", "xhr");
        post.body = Some("payload".to_string());
        buffer.on_request(post);

        let mut get = request("https://x.test/b", "GET", "xhr");
        get.body = Some("ignored".to_string());
        buffer.on_request(get);

        match buffer.on_response(response("https://x.test/a", 200)) {
            ResponseOutcome::NeedsBody { event, .. } => {
                assert_eq!(event.request_body.as_deref(), Some("payload"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        match buffer.on_response(response("https://x.test/b", 200)) {
            ResponseOutcome::NeedsBody { event, .. } => {
                assert_eq!(event.request_body, None);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn non_api_responses_buffer_immediately() {
        let mut buffer = CorrelationBuffer::new();
        buffer.on_request(request("https://x.test/style.css", "GET", "stylesheet"));

        match buffer.on_response(response("https://x.test/style.css", 200)) {
            ResponseOutcome::Buffered(event) => assert_eq!(event.status, Some(200)),
            other => panic!("unexpected outcome {other:?}"),
        }
        let (network, _) = buffer.drain_window();
        assert_eq!(network.len(), 1);
        assert_eq!(network[0].timing_ms, Some(12.5));
    }

    #[test]
    fn orphaned_responses_are_dropped() {
        let mut buffer = CorrelationBuffer::new();
        assert!(matches!(
            buffer.on_response(response("https://x.test/never", 200)),
            ResponseOutcome::Orphaned
        ));
        assert!(buffer.drain_window().0.is_empty());
    }

    #[test]
    fn duplicate_url_overwrites_pending_entry() {
        let mut buffer = CorrelationBuffer::new();
        buffer.on_request(request("https://x.test/a", "GET", "xhr"));
        buffer.on_request(request("https://x.test/a", "POST", "xhr"));
        assert_eq!(buffer.pending_count(), 1);

        match buffer.on_response(response("https://x.test/a", 200)) {
            ResponseOutcome::NeedsBody { event, .. } => assert_eq!(event.method, "POST"),
            other => panic!("unexpected outcome {other:?}"),
        }
        // The first request's response is now an orphan.
        assert!(matches!(
            buffer.on_response(response("https://x.test/a", 200)),
            ResponseOutcome::Orphaned
        ));
    }

    #[test]
    fn failed_requests_land_in_window_with_error() {
        let mut buffer = CorrelationBuffer::new();
        buffer.on_request(request("https://x.test/a", "GET", "fetch"));
        let event = buffer
            .on_request_failed("https://x.test/a", "net::ERR_FAILED".to_string())
            .unwrap();
        assert_eq!(event.error.as_deref(), Some("net::ERR_FAILED"));
        assert_eq!(event.status, None);

        let (network, _) = buffer.drain_window();
        assert_eq!(network.len(), 1);
    }

    #[test]
    fn drain_window_empties_the_buffer() {
        let mut buffer = CorrelationBuffer::new();
        buffer.on_console(ConsoleEvent {
            level: crate::model::ConsoleLevel::Log,
            message: "one".to_string(),
            source: None,
            args: Vec::new(),
            occurred_at: Utc::now(),
        });
        let (network, console) = buffer.drain_window();
        assert!(network.is_empty());
        assert_eq!(console.len(), 1);

        let (network, console) = buffer.drain_window();
        assert!(network.is_empty() && console.is_empty());
    }

    #[test]
    fn body_preview_applies_caps() {
        let small = body_preview(b"hello");
        assert_eq!(small, "hello");

        let long = "x".repeat(RESPONSE_BODY_MAX_CHARS + 1);
        let preview = body_preview(long.as_bytes());
        assert!(preview.ends_with("... (truncated)"));

        let huge = vec![b'a'; RESPONSE_BODY_MAX_BYTES + 1];
        assert_eq!(
            body_preview(&huge),
            format!("[Large response, {} bytes]", huge.len())
        );

        let binary = [0xff, 0xfe, 0x00];
        assert_eq!(body_preview(&binary), "[Binary data, 3 bytes]");
    }
}
