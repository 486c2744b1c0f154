//! Recovery of JSON records from free-form model output.
//!
//! Candidates are tried in a fixed order: the whole trimmed text, a
//! ```` ```json ```` fenced block, a bare fenced block, then the span from the
//! first `{` to the last `}`. The first candidate that parses wins.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse the first candidate that deserialises as `T`. `None` means no usable result.
pub fn extract<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    candidates(trimmed).find_map(|candidate| serde_json::from_str::<T>(candidate).ok())
}

/// Untyped variant of [`extract`].
pub fn extract_json(text: &str) -> Option<Value> {
    extract::<Value>(text)
}

fn candidates(trimmed: &str) -> impl Iterator<Item = &str> {
    [
        Some(trimmed),
        fenced_block(trimmed, "```json"),
        fenced_block(trimmed, "```"),
        brace_span(trimmed),
    ]
    .into_iter()
    .flatten()
}

/// Contents between `opener` and the next closing fence.
fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
