use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text of the synthesized greeting shown in a fresh conversation.
pub const WELCOME_TEXT: &str = "Welcome! Tell me what you'd like to learn today.";
/// Text of the banner appended when the tutor moves into explaining.
pub const BANNER_TEXT: &str = "--- Starting Learning Session ---";
/// Marker used to recognise an already-present explaining banner.
pub const BANNER_MARKER: &str = "Starting Learning Session";

/// Author of a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Ai,
    Model,
    System,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
            Self::Model => "model",
            Self::System => "system",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Ai | Self::Model)
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "user" => Self::User,
            "ai" => Self::Ai,
            "model" => Self::Model,
            "system" => Self::System,
            _ => Self::Other(raw),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

fn null_as_unknown_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(Role::from)
        .unwrap_or_default())
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// The `type` tag of a transcript entry. Absent tags are modelled as `None`
/// on [`Message::kind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Message,
    Info,
    Syllabus,
    Internal,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::Info => "info",
            Self::Syllabus => "syllabus",
            Self::Internal => "internal",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for MessageKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "message" => Self::Message,
            "info" => Self::Info,
            "syllabus" => Self::Syllabus,
            "internal" => Self::Internal,
            _ => Self::Other(raw),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Message body: plain text, or any other JSON value the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Text form of the body. Structured values render as compact JSON.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Builds content from an arbitrary JSON payload, unwrapping plain strings.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// One transcript entry. Entries are immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Absent or null roles load as an empty `Role::Other`.
    #[serde(default, deserialize_with = "null_as_unknown_role")]
    pub role: Role,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, kind: Option<MessageKind>, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            kind,
            content: content.into(),
        }
    }

    pub fn welcome() -> Self {
        Self::new(Role::System, Some(MessageKind::Info), WELCOME_TEXT)
    }

    pub fn banner() -> Self {
        Self::new(Role::System, Some(MessageKind::Info), BANNER_TEXT)
    }

    pub fn syllabus(payload: Value) -> Self {
        Self::new(
            Role::System,
            Some(MessageKind::Syllabus),
            MessageContent::from_value(payload),
        )
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Some(MessageKind::Message), text.into())
    }

    /// Assistant reply as appended after a successful turn. Replies carry no tag.
    pub fn ai(reply: Value) -> Self {
        Self::new(Role::Ai, None, MessageContent::from_value(reply))
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// True for an info entry that already announces the explaining phase.
    pub fn is_explaining_banner(&self) -> bool {
        self.kind == Some(MessageKind::Info) && self.content.as_text().contains(BANNER_MARKER)
    }

    /// Gives every loaded entry an explicit tag: user entries without one
    /// become `message`, everything else keeps what the server sent.
    pub fn retagged(mut self) -> Self {
        if self.kind.is_none() && self.is_user() {
            self.kind = Some(MessageKind::Message);
        }
        self
    }
}
