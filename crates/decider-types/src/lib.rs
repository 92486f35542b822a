pub mod call_id;
pub mod child_policy;
pub mod descriptor;
pub mod error;
pub mod identity;
pub mod payload;

pub use call_id::CallId;
pub use child_policy::ChildPolicy;
pub use descriptor::{ActivityTypeDescriptor, ProxyDescriptor, WorkflowTypeDescriptor};
pub use error::DomainError;
pub use identity::default_identity;
pub use payload::{ArgsKwargs, Codec, CodecError, JsonCodec, Payload};

/// Hard field-size caps enforced by truncation before anything is sent to
/// the remote service.
pub const INPUT_SIZE: usize = 32768;
pub const RESULT_SIZE: usize = 32768;
pub const REASON_SIZE: usize = 256;
pub const IDENTITY_SIZE: usize = 256;
pub const MAX_TAGS: usize = 5;

/// Truncate a string to at most `max` bytes, respecting UTF-8 boundaries.
pub fn truncate_to(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Deduplicate and cap a tag list to [`MAX_TAGS`] unique entries, preserving
/// first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        if seen.insert(tag.clone()) {
            out.push(tag.clone());
        }
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "a".repeat(10);
        assert_eq!(truncate_to(&s, 3), "aaa");
        assert_eq!(truncate_to(&s, 100), s);
    }

    #[test]
    fn tags_dedupe_and_cap() {
        let tags = vec!["a", "b", "a", "c", "d", "e", "f"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(normalize_tags(&tags), vec!["a", "b", "c", "d", "e"]);
    }
}
