use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use super::fingerprint::Fingerprint;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[(?P<id>\d+)\]$").unwrap());

static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((?P<priority>\w+)\)$").unwrap());

static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+(?P<project>\S+)$").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@(?P<tag>\S+)$").unwrap());

static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<key>\w+):(?P<value>\S+)$").unwrap());

/// Why a shorthand line could not produce a [`TaskFields`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("No description found.")]
    MissingDescription,
}

/// A line that could not be turned into a stored task, and why.
///
/// Failures stay line-addressable: `line` is the text exactly as the user
/// wrote it, so it can be handed back for correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub line: String,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(line: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            line: line.into(),
            reason: reason.to_string(),
        }
    }
}

/// Structured fields pulled out of one shorthand line:
///
/// `[id] (priority) description +project @tag... key:value...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub id: Option<u64>,
    pub priority: Option<String>,
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub description: String,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Id(u64),
    Priority(String),
    Project(String),
    Tag(String),
    Attribute(String, String),
    Text,
}

#[derive(Debug)]
struct Token {
    span: Range<usize>,
    kind: TokenKind,
}

impl TaskFields {
    /// Parse a shorthand line.
    ///
    /// The line is tokenized once on whitespace. Every token is tagged with a
    /// kind, and the description is rebuilt from the `Text` tokens only, so no
    /// extraction step can eat text another step already claimed.
    pub fn parse(line: &str) -> Result<Self, FieldError> {
        let tokens = tokenize(line);

        let mut id = None;
        let mut priority = None;
        let mut project = None;
        let mut tags = Vec::new();
        let mut attributes = BTreeMap::new();
        let mut words: Vec<&str> = Vec::new();

        for token in &tokens {
            match &token.kind {
                TokenKind::Id(n) => id = Some(*n),
                TokenKind::Priority(p) => priority = Some(p.clone()),
                TokenKind::Project(p) => {
                    // First `+project` wins; later ones are still consumed.
                    if project.is_none() {
                        project = Some(p.clone());
                    }
                }
                TokenKind::Tag(t) => tags.push(t.clone()),
                TokenKind::Attribute(k, v) => {
                    attributes.insert(k.clone(), v.clone());
                }
                TokenKind::Text => words.push(&line[token.span.clone()]),
            }
        }

        let description = words.join(" ");
        if description.is_empty() {
            return Err(FieldError::MissingDescription);
        }

        Ok(Self {
            id,
            priority,
            project,
            tags,
            attributes,
            fingerprint: Fingerprint::of(&description),
            description,
        })
    }
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for m in TOKEN_RE.find_iter(line) {
        let kind = classify(m.as_str(), &tokens);
        tokens.push(Token {
            span: m.range(),
            kind,
        });
    }
    tokens
}

/// Decide what a single token is. `previous` holds the tokens already seen,
/// since `[id]` and `(priority)` are only recognized at the start of a line.
fn classify(text: &str, previous: &[Token]) -> TokenKind {
    let at_start = previous.is_empty();
    let after_id = previous.len() == 1 && matches!(previous[0].kind, TokenKind::Id(_));

    if at_start {
        if let Some(id) = ID_RE
            .captures(text)
            .and_then(|c| c["id"].parse::<u64>().ok())
        {
            return TokenKind::Id(id);
        }
    }

    if at_start || after_id {
        if let Some(caps) = PRIORITY_RE.captures(text) {
            return TokenKind::Priority(caps["priority"].to_string());
        }
    }

    if let Some(caps) = PROJECT_RE.captures(text) {
        return TokenKind::Project(caps["project"].to_string());
    }

    if let Some(caps) = TAG_RE.captures(text) {
        return TokenKind::Tag(caps["tag"].to_string());
    }

    if let Some(caps) = ATTRIBUTE_RE.captures(text) {
        return TokenKind::Attribute(caps["key"].to_string(), caps["value"].to_string());
    }

    TokenKind::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_line() {
        let fields =
            TaskFields::parse("(H) Write report +work @home @urgent due:2024-01-01").unwrap();
        assert_eq!(fields.id, None);
        assert_eq!(fields.priority.as_deref(), Some("H"));
        assert_eq!(fields.project.as_deref(), Some("work"));
        assert_eq!(fields.tags, vec!["home", "urgent"]);
        assert_eq!(fields.attributes.len(), 1);
        assert_eq!(fields.attributes["due"], "2024-01-01");
        assert_eq!(fields.description, "Write report");
        assert_eq!(fields.fingerprint, Fingerprint::of("WRITE REPORT"));
    }

    #[test]
    fn empty_description_is_rejected() {
        let err = TaskFields::parse("@home +work").unwrap_err();
        assert_eq!(err, FieldError::MissingDescription);
        assert_eq!(err.to_string(), "No description found.");
    }

    #[test]
    fn leading_id_only_strips_the_id() {
        let fields = TaskFields::parse("[42] Fix (the) sink @home").unwrap();
        assert_eq!(fields.id, Some(42));
        assert_eq!(fields.priority, None);
        assert_eq!(fields.description, "Fix (the) sink");
    }

    #[test]
    fn id_then_priority() {
        let fields = TaskFields::parse("[7] (U) Renew passport").unwrap();
        assert_eq!(fields.id, Some(7));
        assert_eq!(fields.priority.as_deref(), Some("U"));
        assert_eq!(fields.description, "Renew passport");
    }

    #[test]
    fn bracketed_number_mid_line_is_text() {
        let fields = TaskFields::parse("Read chapter [3] tonight").unwrap();
        assert_eq!(fields.id, None);
        assert_eq!(fields.description, "Read chapter [3] tonight");
    }

    #[test]
    fn priority_only_at_line_start() {
        let fields = TaskFields::parse("Call (M) back").unwrap();
        assert_eq!(fields.priority, None);
        assert_eq!(fields.description, "Call (M) back");
    }

    #[test]
    fn first_project_wins_and_all_are_removed() {
        let fields = TaskFields::parse("Plan trip +travel +family").unwrap();
        assert_eq!(fields.project.as_deref(), Some("travel"));
        assert_eq!(fields.description, "Plan trip");
    }

    #[test]
    fn tags_keep_order_and_duplicates() {
        let fields = TaskFields::parse("@b Sort mail @a @b").unwrap();
        assert_eq!(fields.tags, vec!["b", "a", "b"]);
        assert_eq!(fields.description, "Sort mail");
    }

    #[test]
    fn later_attribute_overwrites_earlier() {
        let fields = TaskFields::parse("Water plants due:2024-01-01 due:2024-02-02").unwrap();
        assert_eq!(fields.attributes["due"], "2024-02-02");
    }

    #[test]
    fn empty_attribute_value_stays_in_description() {
        let fields = TaskFields::parse("(N) Task due: scheduled:").unwrap();
        assert!(fields.attributes.is_empty());
        assert_eq!(fields.description, "Task due: scheduled:");
    }

    #[test]
    fn whitespace_is_collapsed() {
        let fields = TaskFields::parse("  Buy   milk   @errand  ").unwrap();
        assert_eq!(fields.description, "Buy milk");
    }

    #[test]
    fn case_only_changes_keep_fingerprint() {
        let a = TaskFields::parse("Buy milk @errand").unwrap();
        let b = TaskFields::parse("(H) BUY MILK +home").unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn fingerprint_is_taken_from_the_final_description() {
        let fields = TaskFields::parse("[4]  Buy   milk @errand +home").unwrap();
        assert_eq!(fields.fingerprint, Fingerprint::of("Buy milk"));
        assert_ne!(fields.fingerprint, Fingerprint::of(""));
    }
}
