use tutorchat_api::ServerErrorBody;

/// Failure of a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("cannot reach server: {0}")]
    Transport(String),

    /// Non-2xx response. `body` is parsed leniently and may be empty.
    #[error("server returned {status}{}", detail(body))]
    Server { status: u16, body: ServerErrorBody },

    /// 2xx response whose body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

fn detail(body: &ServerErrorBody) -> String {
    body.error_message()
        .map(|msg| format!(" - {msg}"))
        .unwrap_or_default()
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn server_body(&self) -> Option<&ServerErrorBody> {
        match self {
            Self::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Short text for list-level error banners: the server's own `error`
    /// string when it sent one, otherwise this error's display form.
    pub fn user_message(&self) -> String {
        self.server_body()
            .and_then(ServerErrorBody::error_message)
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
