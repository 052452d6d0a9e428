//! Host-side recording engine: correlation buffer, session state machine,
//! step assembly, and the runtime that drives a session from a boundary
//! channel or an event tape.

pub mod correlate;
pub mod describe;
pub mod recorder;
pub mod runtime;
pub mod screenshot;
pub mod session;

pub use correlate::{
    body_preview, is_synthetic_url, BodyFetchError, CorrelationBuffer, ResponseBodyFetcher,
    ResponseOutcome, UnavailableBodyFetcher, RESPONSE_BODY_MAX_BYTES, RESPONSE_BODY_MAX_CHARS,
};
pub use recorder::{Recorder, RecorderHandle, RecorderMsg};
pub use runtime::run_from_tape;
pub use screenshot::{screenshot_filename, NullScreenshotter, ScreenshotError, Screenshotter};
pub use session::{RecordingSession, RecordingState, SessionMeta};
