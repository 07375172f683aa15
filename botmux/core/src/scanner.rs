//! Incremental Tag Scanner
//!
//! A synchronous state machine that resolves a growing text stream into runs
//! of content attributed to topics. Structural tags look like `<name>` and
//! `</name>` where `name` is a registered topic; any other `<` is plain
//! content. The scanner never waits for input: a trailing partial tag that
//! could still become structural stays buffered until more text arrives or
//! the turn ends.
//!
//! The scanner owns no channels and performs no I/O, so every parsing edge
//! case is testable without async plumbing. The multiplexer worker drives it
//! and routes the resulting [`Span`]s to subscribers.

use std::collections::BTreeSet;

use crate::multiplexer::DEFAULT_TOPIC;

/// A resolved run of content attributed to a single topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    /// Topic the content belongs to (`DEFAULT_TOPIC` outside any tag).
    pub topic: String,
    /// The content, exactly as it appeared in the stream.
    pub text: String,
}

/// Whether `b` can appear in a topic name.
fn is_topic_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

/// Whether `name` is usable as a topic: one or more of `[A-Za-z0-9-]`.
pub(crate) fn is_valid_topic(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_topic_char)
}

/// Outcome of inspecting a `<` in the buffer.
enum TagMatch {
    /// A complete tag naming a registered topic.
    Tag {
        name: String,
        close: bool,
        len: usize,
    },
    /// The buffer ends mid-tag and the text so far is still a prefix of some
    /// registered topic's tag; wait for more input.
    Partial,
    /// Not a tag; the `<` is plain content.
    Literal,
}

/// Classify the text starting at a `<`.
///
/// Only names in `topics` are structural. A truncated candidate is deferred
/// only while it can still complete into a registered `<name>`/`</name>`;
/// tag-like noise that can never match resolves to content immediately, so it
/// is delivered with the chunk that carried it rather than held back.
fn classify(s: &str, topics: &BTreeSet<String>) -> TagMatch {
    let bytes = s.as_bytes();
    debug_assert_eq!(bytes.first(), Some(&b'<'));

    let close = bytes.get(1) == Some(&b'/');
    let name_start = if close { 2 } else { 1 };
    let mut idx = name_start;
    while idx < bytes.len() && is_topic_char(bytes[idx]) {
        idx += 1;
    }
    let name = &s[name_start.min(bytes.len())..idx];

    if idx == bytes.len() {
        // Ran out of buffer mid-tag.
        let completable = topics
            .iter()
            .any(|topic| topic.as_bytes().starts_with(name.as_bytes()));
        if completable {
            return TagMatch::Partial;
        }
        return TagMatch::Literal;
    }

    if bytes[idx] == b'>' && topics.contains(name) {
        TagMatch::Tag {
            name: name.to_string(),
            close,
            len: idx + 1,
        }
    } else {
        TagMatch::Literal
    }
}

/// Incremental scanner state: the unprocessed tail of the stream plus the
/// stack of currently open topics, outermost first.
#[derive(Debug, Default)]
pub(crate) struct TagScanner {
    buffer: String,
    stack: Vec<String>,
}

impl TagScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw stream text without scanning.
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// The topic content is currently addressed to.
    pub fn current_topic(&self) -> &str {
        self.stack.last().map_or(DEFAULT_TOPIC, String::as_str)
    }

    /// Resolve as much of the buffer as possible against `topics`.
    ///
    /// A trailing partial tag is left in place for the next call.
    pub fn scan(&mut self, topics: &BTreeSet<String>) -> Vec<Span> {
        self.scan_inner(topics, false)
    }

    /// End-of-turn scan: no more input is coming, so a trailing partial tag
    /// can never complete and is resolved as content of the current topic.
    pub fn flush(&mut self, topics: &BTreeSet<String>) -> Vec<Span> {
        self.scan_inner(topics, true)
    }

    /// Drop all per-turn state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stack.clear();
    }

    fn scan_inner(&mut self, topics: &BTreeSet<String>, at_end: bool) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut lit_start = 0;
        let mut pos = 0;
        let consumed = loop {
            let Some(offset) = self.buffer[pos..].find('<') else {
                self.emit(&mut spans, lit_start, self.buffer.len());
                break self.buffer.len();
            };
            let i = pos + offset;
            match classify(&self.buffer[i..], topics) {
                TagMatch::Tag { name, close, len } => {
                    self.emit(&mut spans, lit_start, i);
                    if close {
                        self.close_topic(&name);
                    } else {
                        tracing::debug!(topic = %name, "topic opened");
                        self.stack.push(name);
                    }
                    pos = i + len;
                    lit_start = pos;
                }
                TagMatch::Partial => {
                    if at_end {
                        self.emit(&mut spans, lit_start, self.buffer.len());
                        break self.buffer.len();
                    }
                    self.emit(&mut spans, lit_start, i);
                    break i;
                }
                TagMatch::Literal => {
                    // The `<` is content; keep scanning after it.
                    pos = i + 1;
                }
            }
        };
        self.buffer.drain(..consumed);
        spans
    }

    /// Emit `buffer[start..end]` as a span for the current topic.
    fn emit(&self, spans: &mut Vec<Span>, start: usize, end: usize) {
        if start < end {
            spans.push(Span {
                topic: self.current_topic().to_string(),
                text: self.buffer[start..end].to_string(),
            });
        }
    }

    /// Close tags are matched leniently: pop through the named topic when it
    /// is open, pop a single level when it is not, ignore on an empty stack.
    fn close_topic(&mut self, name: &str) {
        if let Some(idx) = self.stack.iter().rposition(|topic| topic == name) {
            self.stack.truncate(idx);
        } else if let Some(open) = self.stack.pop() {
            tracing::debug!(tag = %name, open = %open, "lenient close of mismatched tag");
        }
    }
}
