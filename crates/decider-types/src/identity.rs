//! Worker identity, the `identity` field sent on every poll so the service
//! can attribute in-flight tasks to a process.

use crate::{truncate_to, IDENTITY_SIZE};

/// `<hostname>-<pid>`, right-truncated to [`IDENTITY_SIZE`] bytes.
pub fn default_identity() -> String {
    let host = hostname();
    let pid = std::process::id();
    let full = format!("{host}-{pid}");
    right_truncate(&full, IDENTITY_SIZE)
}

fn hostname() -> String {
    // std has no portable hostname accessor; fall back to a fixed label
    // when the environment doesn't expose one.
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn right_truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let start = s.len() - max;
    let mut start = start;
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}
