use regex::Regex;
use std::sync::LazyLock;

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*+ +TODO +(?P<heading>.*)$").unwrap());

static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[#(?P<code>[A-F])\]").unwrap());

static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*:(?P<tags>[^\s:]+(?::[^\s:]+)*):\s*$").unwrap());

static PROPERTIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:PROPERTIES:\s*$").unwrap());

static END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*:END:\s*$").unwrap());

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"DEADLINE: *<(?P<date>\d{4}-\d{2}-\d{2}) \w{3} ?(?P<time>\d{2}:\d{2})?>").unwrap()
});

static SCHEDULED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SCHEDULED: *<(?P<date>\d{4}-\d{2}-\d{2}) \w{3} ?(?P<time>\d{2}:\d{2})?>").unwrap()
});

static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*:project:\s*(?P<name>.*?)\s*$").unwrap());

static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:(?P<key>[^\s:]+):\s*(?P<value>.*?)\s*$").unwrap());

/// Tag given to entries whose heading carries none.
pub const DEFAULT_TAG: &str = "home";

/// Map an org priority cookie letter to a shorthand priority code.
pub fn priority_code(cookie: Option<&str>) -> &'static str {
    match cookie {
        Some("A") => "U",
        Some("B") => "H",
        Some("C") => "M",
        Some("E") => "L",
        Some("F") => "T",
        _ => "N",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    /// An entry is open; the string is its shorthand line so far.
    InEntry(String),
}

/// What a line means while an entry is open.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Annotation {
    DrawerOpen,
    DrawerClose,
    /// Text to append to the open entry (may be empty).
    Append(String),
    /// Nothing recognized; the entry's annotation section is over.
    Unrecognized,
}

/// Converts an org agenda document into shorthand lines.
///
/// Each `TODO` heading opens an entry. Planning lines and the property
/// drawer that follow it are folded into the same shorthand line, which is
/// emitted when `:END:`, an unrelated line, the next heading, or the end of
/// the document closes the entry.
#[derive(Debug)]
pub struct AgendaParser {
    state: State,
    output: String,
    emitted: usize,
}

impl Default for AgendaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AgendaParser {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            output: String::new(),
            emitted: 0,
        }
    }

    /// Parse a whole document. Every returned line ends with `\n`.
    pub fn parse(input: &str) -> String {
        let mut parser = Self::new();
        for line in input.lines() {
            parser.feed(line);
        }
        parser.finish()
    }

    /// Advance the state machine by one document line.
    pub fn feed(&mut self, line: &str) {
        if let Some(caps) = ENTRY_RE.captures(line) {
            self.flush();
            self.state = State::InEntry(heading_to_shorthand(&caps["heading"]));
            return;
        }

        if self.state == State::Idle {
            return;
        }

        match annotate(line) {
            Annotation::DrawerOpen => {}
            Annotation::Append(text) => {
                if let State::InEntry(ref mut entry) = self.state {
                    entry.push_str(&text);
                }
            }
            Annotation::DrawerClose | Annotation::Unrecognized => self.flush(),
        }
    }

    /// Flush any open entry and return everything emitted.
    pub fn finish(mut self) -> String {
        self.flush();
        log::debug!("Agenda parser emitted {} entries", self.emitted);
        self.output
    }

    fn flush(&mut self) {
        if let State::InEntry(entry) = std::mem::replace(&mut self.state, State::Idle) {
            self.output.push_str(&entry);
            self.output.push('\n');
            self.emitted += 1;
        }
    }
}

/// Turn the heading text after `TODO` into `(P) heading @tag...`.
fn heading_to_shorthand(heading: &str) -> String {
    let cookie = PRIORITY_RE
        .captures(heading)
        .map(|c| c["code"].to_string());
    let heading = PRIORITY_RE.replace_all(heading, "");
    let heading = heading.trim();

    let (title, tags) = match TAGS_RE.captures(heading) {
        Some(caps) => {
            let start = caps.get(0).map_or(heading.len(), |m| m.start());
            let tags: Vec<String> = caps["tags"].split(':').map(str::to_string).collect();
            (heading[..start].trim(), tags)
        }
        None => (heading, vec![DEFAULT_TAG.to_string()]),
    };

    let mut out = format!("({}) {}", priority_code(cookie.as_deref()), title);
    for tag in tags {
        out.push_str(" @");
        out.push_str(&tag);
    }
    out
}

/// Classify a line that follows an open entry.
fn annotate(line: &str) -> Annotation {
    if PROPERTIES_RE.is_match(line) {
        return Annotation::DrawerOpen;
    }
    if END_RE.is_match(line) {
        return Annotation::DrawerClose;
    }

    let mut matched = false;
    let mut text = String::new();

    if let Some(caps) = DEADLINE_RE.captures(line) {
        matched = true;
        text.push_str(&planning("due", &caps["date"], caps.name("time").map(|m| m.as_str())));
    }

    if let Some(caps) = SCHEDULED_RE.captures(line) {
        matched = true;
        text.push_str(&planning(
            "scheduled",
            &caps["date"],
            caps.name("time").map(|m| m.as_str()),
        ));
    }

    if let Some(caps) = PROJECT_RE.captures(line) {
        matched = true;
        let name = &caps["name"];
        if !name.is_empty() && !name.contains(char::is_whitespace) {
            text.push_str(" +");
            text.push_str(name);
        }
    }

    if !matched {
        if let Some(caps) = PROPERTY_RE.captures(line) {
            matched = true;
            let key = caps["key"].to_lowercase();
            let value = &caps["value"];
            // A value with spaces has no shorthand form; drop it rather than
            // let its tail leak into the description.
            if !value.is_empty() && !value.contains(char::is_whitespace) {
                text.push_str(&format!(" {}:{}", key, value));
            } else if !value.is_empty() {
                log::debug!("Dropping property `{}` with multi-word value", key);
            }
        }
    }

    if matched {
        Annotation::Append(text)
    } else {
        Annotation::Unrecognized
    }
}

fn planning(key: &str, date: &str, time: Option<&str>) -> String {
    match time {
        Some(time) => format!(" {}:{}T{}", key, date, time),
        None => format!(" {}:{}", key, date),
    }
}
