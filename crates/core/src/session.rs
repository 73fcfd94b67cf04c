use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Stage;

/// Number of id characters shown in the fallback title of an untitled session.
pub const FALLBACK_TITLE_ID_CHARS: usize = 6;

/// One conversation thread as listed by the backend.
///
/// `id` is server-assigned and never changes. `updated_at` drives bucket
/// placement; a rename must carry the previous value forward unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
}

impl Session {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            updated_at: None,
            current_stage: None,
        }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Title for list rows and prompts: the stored title, or `Chat <id prefix>...`.
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            fallback_title(&self.id)
        } else {
            self.title.clone()
        }
    }
}

/// Placeholder title for a session id whose title is unknown or empty.
pub fn fallback_title(id: &str) -> String {
    let prefix: String = id.chars().take(FALLBACK_TITLE_ID_CHARS).collect();
    format!("Chat {prefix}...")
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
