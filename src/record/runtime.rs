//! Drives a full recording session from a previously captured event tape.
//!
//! Entries are replayed in order, as fast as the recorder consumes them;
//! the recorded `at_ms` offsets are informational. A tape without a trailing
//! stop signal gets one appended so the session always freezes.

use std::sync::Arc;

use crate::model::TestCase;
use crate::record::correlate::ResponseBodyFetcher;
use crate::record::recorder::Recorder;
use crate::record::screenshot::Screenshotter;
use crate::record::session::SessionMeta;
use crate::tape::{EventTape, PageMessage};

pub async fn run_from_tape(
    tape: EventTape,
    meta: SessionMeta,
    screenshotter: Arc<dyn Screenshotter>,
    body_fetcher: Arc<dyn ResponseBodyFetcher>,
) -> Option<TestCase> {
    let (recorder, handle) = Recorder::new(meta, screenshotter, body_fetcher);
    let run = tokio::spawn(recorder.run());

    let has_stop = tape
        .entries
        .iter()
        .any(|entry| matches!(entry.message, PageMessage::Stop));

    for entry in tape.entries {
        if !handle.send(entry.message).await {
            tracing::warn!("recorder exited before the tape finished");
            break;
        }
    }
    if !has_stop {
        tracing::debug!("tape has no stop signal, appending one");
        handle.send(PageMessage::Stop).await;
    }
    drop(handle);

    match run.await {
        Ok(testcase) => testcase,
        Err(e) => {
            tracing::error!(error = %e, "recorder task panicked");
            None
        }
    }
}
