//! Storage key builders.
//!
//! Centralising key construction keeps every instance that shares a
//! browsing session pointed at the same slots.

/// Prefix applied to all OrgSession storage keys.
const PREFIX: &str = "orgsession";

/// Key of the instance status table for a browsing session.
///
/// Without a session id the table lives in the shared default namespace.
pub fn status_table(status_key: &str, session_id: Option<&str>) -> String {
    match session_id {
        Some(session) if !session.is_empty() => format!("{PREFIX}:{session}:{status_key}"),
        _ => format!("{PREFIX}:{status_key}"),
    }
}

/// Prefix covering every key of one browsing session.
pub fn session_prefix(session_id: Option<&str>) -> String {
    match session_id {
        Some(session) if !session.is_empty() => format!("{PREFIX}:{session}:"),
        _ => format!("{PREFIX}:"),
    }
}
