use tracing::debug;

use tutorchat_api::{
    ChatRequest, ChatResponse, SessionDetailResponse, SessionListResponse, UpdateTitleResponse,
};
use tutorchat_api_client::{ApiError, TutorBackend};
use tutorchat_core::AuthContext;

use crate::conversation::RequestTag;
use crate::directory::RenameSnapshot;

/// Network work requested by a controller operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Session directory ─────────────────────────────────────────────
    FetchSessions {
        epoch: u64,
    },
    RenameSession {
        snapshot: RenameSnapshot,
        title: String,
    },
    DeleteSession {
        session_id: String,
    },

    // ── Conversation ──────────────────────────────────────────────────
    LoadConversation {
        tag: RequestTag,
        session_id: String,
    },
    SendChat {
        tag: RequestTag,
        request: ChatRequest,
    },
}

/// Outcome of a [`Command`], carrying whatever the command was issued with.
#[derive(Debug)]
pub enum CommandResult {
    Sessions {
        epoch: u64,
        result: Result<SessionListResponse, ApiError>,
    },
    Renamed {
        snapshot: RenameSnapshot,
        result: Result<UpdateTitleResponse, ApiError>,
    },
    Deleted {
        session_id: String,
        result: Result<(), ApiError>,
    },
    ConversationLoaded {
        tag: RequestTag,
        result: Result<SessionDetailResponse, ApiError>,
    },
    ChatReplied {
        tag: RequestTag,
        result: Result<ChatResponse, ApiError>,
    },
}

pub async fn execute<B: TutorBackend>(
    cmd: Command,
    backend: &B,
    auth: &AuthContext,
) -> CommandResult {
    match cmd {
        Command::FetchSessions { epoch } => {
            debug!("fetching session list");
            let result = backend.list_sessions(auth).await;
            CommandResult::Sessions { epoch, result }
        }

        Command::RenameSession { snapshot, title } => {
            let result = backend
                .update_title(&snapshot.session_id, &title, auth)
                .await;
            CommandResult::Renamed { snapshot, result }
        }

        Command::DeleteSession { session_id } => {
            let result = backend.delete_session(&session_id, auth).await;
            CommandResult::Deleted { session_id, result }
        }

        Command::LoadConversation { tag, session_id } => {
            debug!("loading conversation {session_id}");
            let result = backend.session_detail(&session_id, auth).await;
            CommandResult::ConversationLoaded { tag, result }
        }

        Command::SendChat { tag, request } => {
            debug!(
                "sending chat turn (confirmed session: {})",
                request.session_id.as_deref().unwrap_or("(none, new session)")
            );
            let result = backend.send_chat(&request, auth).await;
            CommandResult::ChatReplied { tag, result }
        }
    }
}
