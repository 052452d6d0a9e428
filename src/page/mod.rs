//! In-page capture side: the document model, the element addressor, and the
//! capture-phase event observer.
//!
//! In a live run this logic executes inside the browser page; here it is the
//! same algorithms over an explicit document model, connected to the host
//! side through the boundary channel.

pub mod addressor;
pub mod dom;
pub mod observer;

pub use addressor::{css_escape, locate, selector, structural_path, TEST_ID_ATTRIBUTE};
pub use dom::{Document, Node, NodeId};
pub use observer::{snapshot_element, DomEvent, PageObserver, CONTROL_PANEL_ID, INPUT_DEBOUNCE_MS};
