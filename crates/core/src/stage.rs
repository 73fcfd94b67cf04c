use serde::{Deserialize, Serialize};

/// Coarse phase of the tutoring protocol, as reported by the backend.
///
/// Stage strings the client does not know are kept verbatim in [`Stage::Other`]
/// so they round-trip and still drive the generic input placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    #[default]
    Start,
    Negotiating,
    Explaining,
    Error,
    Other(String),
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "START",
            Self::Negotiating => "NEGOTIATING",
            Self::Explaining => "EXPLAINING",
            Self::Error => "ERROR",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Hint shown in the empty chat input for this stage.
    pub fn input_placeholder(&self) -> &'static str {
        match self {
            Self::Explaining => "Ask about the current topic...",
            Self::Negotiating | Self::Start => "Describe what you want to learn...",
            Self::Error => "An error occurred. Try starting a new chat.",
            Self::Other(_) => "Type your message...",
        }
    }
}

impl From<String> for Stage {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "START" => Self::Start,
            "NEGOTIATING" => Self::Negotiating,
            "EXPLAINING" => Self::Explaining,
            "ERROR" => Self::Error,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for Stage {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
