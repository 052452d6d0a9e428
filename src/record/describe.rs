//! Human-readable step descriptions.
//!
//! Templates are fixed per action kind. The element identifier is the
//! descriptor's display identifier capped at 30 characters; typed values are
//! capped at 20 with an ellipsis.

use crate::model::{ActionKind, RawActionEvent};
use crate::util::text::{truncate_chars, truncate_with_ellipsis};

const IDENTIFIER_MAX_CHARS: usize = 30;
const VALUE_MAX_CHARS: usize = 20;

/// One-line summary of a captured action.
pub fn short_description(event: &RawActionEvent) -> String {
    let identifier = truncate_chars(event.element.display_identifier(), IDENTIFIER_MAX_CHARS);
    match event.kind {
        ActionKind::Click => format!("Click on '{identifier}'"),
        ActionKind::Dblclick => format!("Double-click on '{identifier}'"),
        ActionKind::Input => {
            let value = truncate_with_ellipsis(event.value.as_deref().unwrap_or(""), VALUE_MAX_CHARS);
            format!("Type '{value}' in {identifier}")
        }
        ActionKind::Select => {
            let label = event
                .value_label
                .as_deref()
                .or(event.value.as_deref())
                .unwrap_or("");
            format!("Select '{label}' in {identifier}")
        }
        ActionKind::Check => format!("Check '{identifier}'"),
        ActionKind::Uncheck => format!("Uncheck '{identifier}'"),
        ActionKind::Keypress => {
            let key = event.key.as_deref().unwrap_or("");
            format!("Press {key}")
        }
    }
}

/// Short description plus the resolved selector, for export surfaces that
/// show locators.
pub fn detailed_description(event: &RawActionEvent) -> String {
    format!(
        "{}\nElement: {}",
        short_description(event),
        event.element.selector
    )
}
