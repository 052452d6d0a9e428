pub mod cli;
pub mod export;
pub mod model;
pub mod page;
pub mod record;
pub mod tape;
pub mod util;

pub use export::{export_all, default_exporters, ExportError, Exporter};
pub use model::{
    ActionKind, ConsoleEvent, ConsoleLevel, ElementDescriptor, NetworkEvent, PageFault,
    RawActionEvent, ScreenshotRef, Step, TestCase, Viewport,
};
pub use page::{Document, NodeId, PageObserver};
pub use record::{
    run_from_tape, Recorder, RecorderHandle, RecordingSession, RecordingState, ResponseBodyFetcher,
    Screenshotter, SessionMeta,
};
pub use tape::{EventTape, PageMessage, TapeEntry, TapeWriter};
