use tutorchat_api::Stage;
use tutorchat_api_client::ApiError;

/// Why a chat turn failed, worded for the conversation's error line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatFailure {
    #[error("Cannot reach server.")]
    Unreachable,

    #[error("Server Error: {status} - {message}")]
    ServerMessage { status: u16, message: String },

    /// The AI layer answered with a bracketed error tag such as `[SYSTEM ERROR]`.
    #[error("AI Error: {tag}")]
    Ai { tag: String },

    #[error("Server Error: {status}")]
    Status { status: u16 },

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ChatFailure {
    pub fn from_api(err: &ApiError) -> Self {
        match err {
            ApiError::Transport(_) => Self::Unreachable,
            ApiError::Server { status, body } => {
                if let Some(message) = body.error_message() {
                    Self::ServerMessage {
                        status: *status,
                        message: message.to_string(),
                    }
                } else if let Some(tag) = body.ai_error_tag() {
                    Self::Ai {
                        tag: tag.to_string(),
                    }
                } else {
                    Self::Status { status: *status }
                }
            }
            ApiError::Decode(detail) => Self::Unexpected(detail.clone()),
        }
    }
}

/// Stage a conversation enters after a failed call: the one the server named
/// in its error body, otherwise [`Stage::Error`].
pub fn failure_stage(err: &ApiError) -> Stage {
    err.server_body()
        .and_then(|body| body.stage())
        .cloned()
        .unwrap_or(Stage::Error)
}

/// Local precondition failures for a send. Logged, never shown as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejected {
    #[error("message is empty")]
    EmptyInput,
    #[error("a request is already in flight")]
    Busy,
    #[error("first turn has not been acknowledged with a session id yet")]
    AwaitingSessionId,
    #[error("conversation is in the error stage; start a new chat")]
    Errored,
}

/// Local precondition failures for a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RenameRejected {
    #[error("title is empty")]
    EmptyTitle,
    #[error("title is unchanged")]
    Unchanged,
    #[error("session is not in the list")]
    NotListed,
}
