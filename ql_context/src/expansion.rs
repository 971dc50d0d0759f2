//! ABOUTME: Expanded prompt context gathered from an author's other approved topics

use crate::{Topic, TopicStatus};

pub const EXPANDED_CONTEXT_HEADER: &str = "Related approved topics:";

/// Bullet list of up to `limit` related approved topics, excluding `current_id`.
///
/// Empty when there is nothing related, so callers can append it unconditionally.
pub fn expanded_context(related: &[Topic], current_id: &str, limit: usize) -> String {
    let titles: Vec<&str> = related
        .iter()
        .filter(|t| t.id != current_id && t.status == TopicStatus::Approved)
        .map(|t| t.title.trim())
        .filter(|title| !title.is_empty())
        .take(limit)
        .collect();

    if titles.is_empty() {
        return String::new();
    }

    let mut out = String::from(EXPANDED_CONTEXT_HEADER);
    for title in titles {
        out.push_str("\n- ");
        out.push_str(title);
    }
    out
}
