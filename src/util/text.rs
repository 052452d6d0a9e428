//! Small text helpers shared by capture and export code.

/// Truncate to at most `max` characters, on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Truncate to `max` characters, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max))
    } else {
        s.to_string()
    }
}

/// Reduce a string to a filesystem-safe component: alphanumerics and
/// hyphens pass through, everything else becomes a hyphen. Capped at
/// `max_len` characters.
pub fn sanitize_component(s: &str, max_len: usize) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '-' })
        .take(max_len)
        .collect()
}
