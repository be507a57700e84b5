use regex::Regex;
use std::sync::LazyLock;

static TODO_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?P<stars>\*+ +)TODO\b").unwrap());

/// Keyword written over `TODO` once an entry has been handed to the store.
pub const TASKED: &str = "TASKED";

/// Rewrite every `TODO` heading marker to `TASKED`.
///
/// Everything else in the document is left byte for byte, so the file can be
/// written straight back over the original.
pub fn mark_tasked(input: &str) -> String {
    TODO_MARKER_RE
        .replace_all(input, |caps: &regex::Captures| {
            format!("{}{}", &caps["stars"], TASKED)
        })
        .into_owned()
}
