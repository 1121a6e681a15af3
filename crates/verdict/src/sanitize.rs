//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Content references may be full storage paths or signed URLs; spans only
//! ever see the final segment or a hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Returns the last path segment of a content reference, without any query
/// string or fragment.
///
/// - `uploads/2026/abc.jpg` → `abc.jpg`
/// - `https://cdn.example.com/u/clip.mp4?sig=XYZ` → `clip.mp4`
pub fn redact_content_ref(content_ref: &str) -> String {
    let without_query = content_ref
        .split(['?', '#'])
        .next()
        .unwrap_or(content_ref);
    without_query
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns a short deterministic hash of a content reference for correlation
/// without exposing it.
pub fn hash_content_ref(content_ref: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content_ref.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
