//! Request and response types of the tutoring backend's HTTP API.
//!
//! All bodies are snake_case JSON. Endpoint paths are relative to the
//! configured API base URL (for example `http://127.0.0.1:8001/api`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Re-export core types for convenience
pub use tutorchat_core::{Message, MessageContent, MessageKind, Role, Session, Stage};

// ─── Endpoints ──────────────────────────────────────────────────────────────

pub mod paths {
    pub const SESSIONS: &str = "sessions/";
    pub const CHAT: &str = "chat/";

    pub fn session_detail(id: &str) -> String {
        format!("session/{}/", urlencoding::encode(id))
    }

    pub fn update_title(id: &str) -> String {
        format!("session/{}/update_title/", urlencoding::encode(id))
    }

    pub fn delete_session(id: &str) -> String {
        format!("session/{}/delete/", urlencoding::encode(id))
    }
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// `GET sessions/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionListResponse {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// `PATCH session/{id}/update_title/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
}

/// Confirmed title after a rename. Only `title` is relied upon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTitleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `GET session/{id}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub current_stage: Option<Stage>,
}

// ─── Chat ───────────────────────────────────────────────────────────────────

/// `POST chat/`. `session_id` is `null` on the first turn of a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
    pub session_id: Option<String>,
}

/// Protocol signals attached to a chat reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_syllabus: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_to_explainer: Option<Value>,
}

impl NewState {
    /// Syllabus payload to show, if the signal carries one.
    pub fn syllabus(&self) -> Option<&Value> {
        self.display_syllabus.as_ref().filter(|value| is_truthy(value))
    }

    pub fn transitions_to_explainer(&self) -> bool {
        self.transition_to_explainer.as_ref().is_some_and(is_truthy)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reply: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<NewState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatResponse {
    /// Assistant reply worth appending; empty strings and nulls count as absent.
    pub fn reply(&self) -> Option<&Value> {
        self.ai_reply.as_ref().filter(|value| is_truthy(value))
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.new_state.as_ref().and_then(|state| state.stage.as_ref())
    }

    /// Returned session id, ignoring blanks.
    pub fn confirmed_session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Body of a non-2xx response.
///
/// Most endpoints send `{ "error": "..." }`. The chat endpoint may instead send
/// a bracketed `ai_reply` tag such as `[SYSTEM ERROR]` together with a
/// `new_state.stage`. Every field is optional so any JSON object parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reply: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<ErrorState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl ServerErrorBody {
    /// Parses an error body leniently; anything unparseable yields an empty body.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|msg| !msg.is_empty())
    }

    /// The AI-layer error tag, when the reply looks like `[SOMETHING]...`.
    pub fn ai_error_tag(&self) -> Option<&str> {
        match &self.ai_reply {
            Some(Value::String(reply)) if reply.starts_with('[') => Some(reply),
            _ => None,
        }
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.new_state.as_ref().and_then(|state| state.stage.as_ref())
    }
}

/// JSON truthiness as the backend's signals use it.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
