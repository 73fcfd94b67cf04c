//! Maps transcript entries to rendering categories.
//!
//! Rules are checked in a fixed order and the first match wins. Tag-based
//! rules (`internal`, `syllabus`, `info`) always take precedence over
//! role-based ones.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::message::{Message, MessageContent, MessageKind, Role};

/// Heading shown above every rendered syllabus.
pub const SYLLABUS_HEADING: &str = "Syllabus Draft/Update";

static SYLLABUS_WRAPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?syllabus>").unwrap());
static UNSAFE_MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<[^>]+script|<[^>]+\bon\w+=").unwrap());
static DETAIL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(keywords:|objective:|focus:)").unwrap());

/// Why an entry is shown as literal, preformatted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralReason {
    UserInput,
    /// Assistant text that looked like it carried script or event-handler markup.
    UnsafeMarkup,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyllabusLine {
    Phase { text: String },
    Topic { text: String },
    Detail { label: String, value: String },
    Other { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyllabusView {
    pub heading: &'static str,
    pub lines: Vec<SyllabusLine>,
}

/// How a single transcript entry should be presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendering {
    /// Nothing is shown.
    Hidden,
    Syllabus(SyllabusView),
    Banner { text: String },
    Literal { text: String, reason: LiteralReason },
    RichText { markdown: String },
}

/// Classifies one entry. Total over all messages.
pub fn classify(message: &Message) -> Rendering {
    if matches!(message.content, MessageContent::Structured(Value::Null)) {
        return Rendering::Hidden;
    }
    let text = message.content.as_text();

    match message.kind {
        Some(MessageKind::Internal) => return Rendering::Hidden,
        Some(MessageKind::Syllabus) => return Rendering::Syllabus(parse_syllabus(&text)),
        Some(MessageKind::Info) => return Rendering::Banner { text },
        _ => {}
    }

    match message.role {
        Role::User => Rendering::Literal {
            text,
            reason: LiteralReason::UserInput,
        },
        Role::Ai | Role::Model if looks_unsafe(&text) => Rendering::Literal {
            text,
            reason: LiteralReason::UnsafeMarkup,
        },
        Role::Ai | Role::Model => Rendering::RichText { markdown: text },
        Role::System | Role::Other(_) => Rendering::Literal {
            text,
            reason: LiteralReason::Fallback,
        },
    }
}

/// Narrow heuristic for script tags and inline event handlers.
pub fn looks_unsafe(text: &str) -> bool {
    UNSAFE_MARKUP_RE.is_match(text)
}

/// Splits a syllabus payload into classified, non-blank lines.
pub fn parse_syllabus(raw: &str) -> SyllabusView {
    let stripped = SYLLABUS_WRAPPER_RE.replace_all(raw, "");
    let lines = stripped
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(classify_syllabus_line)
        .collect();

    SyllabusView {
        heading: SYLLABUS_HEADING,
        lines,
    }
}

fn classify_syllabus_line(line: &str) -> SyllabusLine {
    let lower = line.to_lowercase();
    if lower.starts_with("phase") {
        return SyllabusLine::Phase {
            text: line.to_string(),
        };
    }
    if lower.starts_with("topic:") {
        return SyllabusLine::Topic {
            text: line.to_string(),
        };
    }
    if DETAIL_PREFIX_RE.is_match(line) {
        if let Some((label, value)) = line.split_once(':') {
            return SyllabusLine::Detail {
                label: label.trim().to_string(),
                value: value.trim().to_string(),
            };
        }
    }
    SyllabusLine::Other {
        text: line.to_string(),
    }
}
