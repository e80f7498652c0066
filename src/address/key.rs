//! Storage key encoding
//!
//! Keys are `/`-joined segments. Each segment is escaped so identifiers that
//! contain `/` or `%` can never alias another key or leak into a sibling
//! prefix during a scan.

use std::borrow::Cow;

/// Escape one key segment (`%` → `%25`, `/` → `%2F`).
#[must_use]
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains(['%', '/']) {
        return Cow::Borrowed(segment);
    }
    let mut escaped = String::with_capacity(segment.len() + 4);
    for ch in segment.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Build a full key from segments.
#[must_use]
pub fn join(segments: &[&str]) -> String {
    let mut key = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            key.push('/');
        }
        key.push_str(&escape_segment(segment));
    }
    key
}

/// Build a scan prefix from segments.
///
/// The trailing `/` keeps `job-1` from matching `job-10`.
#[must_use]
pub fn prefix(segments: &[&str]) -> String {
    let mut key = join(segments);
    key.push('/');
    key
}
