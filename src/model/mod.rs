//! Data model for recorded sessions.
//!
//! Everything here is a plain serde value: element snapshots, normalized
//! action events, network/console/fault records, assembled steps, and the
//! final `TestCase` artifact handed to exporters.

pub mod element;
pub mod events;
pub mod step;

pub use element::{BoundingBox, ElementAttributes, ElementDescriptor};
pub use events::{
    ActionKind, ConsoleEvent, ConsoleLevel, NetworkEvent, PageFault, RawActionEvent,
    RequestRecord, ResponseRecord,
};
pub use step::{ScreenshotRef, Step, TestCase, Viewport};
