//! Screenshot collaborator seam.
//!
//! The engine never talks to a browser directly; it asks a [`Screenshotter`]
//! for an optional screenshot per step and degrades gracefully when capture
//! fails or is disabled.

use async_trait::async_trait;

use crate::model::{ActionKind, ElementDescriptor, ScreenshotRef};
use crate::util::text::sanitize_component;

const FILENAME_HINT_MAX_CHARS: usize = 30;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ScreenshotError(pub String);

/// Captures a screenshot for an assembled step. A `Ok(None)` means capture
/// is disabled; an `Err` is logged and the step proceeds without an image.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    async fn capture(
        &self,
        step_number: u32,
        action: ActionKind,
        element: Option<&ElementDescriptor>,
    ) -> Result<Option<ScreenshotRef>, ScreenshotError>;
}

/// Screenshotter for runs without a browser; never produces an image.
pub struct NullScreenshotter;

#[async_trait]
impl Screenshotter for NullScreenshotter {
    async fn capture(
        &self,
        _step_number: u32,
        _action: ActionKind,
        _element: Option<&ElementDescriptor>,
    ) -> Result<Option<ScreenshotRef>, ScreenshotError> {
        Ok(None)
    }
}

/// Canonical on-disk name for a step screenshot:
/// `{step:03}_{action}_{sanitized-identifier}.png`.
pub fn screenshot_filename(step_number: u32, action: ActionKind, hint: &str) -> String {
    format!(
        "{:03}_{}_{}.png",
        step_number,
        action.as_str(),
        sanitize_component(hint, FILENAME_HINT_MAX_CHARS)
    )
}
