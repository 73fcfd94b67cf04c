use std::collections::VecDeque;

use chrono::{DateTime, TimeZone};
use tracing::{debug, info};

use tutorchat_api_client::TutorBackend;
use tutorchat_core::AuthContext;

use crate::async_ops::{execute, Command, CommandResult};
use crate::conversation::Conversation;
use crate::directory::SessionDirectory;
use crate::error::{RenameRejected, SendRejected};

/// Both controllers plus the caller's identity.
///
/// The directory decides which session is active; the conversation follows
/// it. The only traffic in the other direction is a newly confirmed session
/// id, which the conversation hands up after a successful send.
#[derive(Debug, Default)]
pub struct App {
    pub directory: SessionDirectory,
    pub conversation: Conversation,
    auth: AuthContext,
}

impl App {
    pub fn new(auth: AuthContext) -> Self {
        Self {
            directory: SessionDirectory::new(),
            conversation: Conversation::new_chat(),
            auth,
        }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Initial list fetch.
    pub fn startup(&mut self) -> Vec<Command> {
        vec![self.directory.fetch()]
    }

    // ── Directory operations ──────────────────────────────────────────

    pub fn select_session(&mut self, id: &str) -> Vec<Command> {
        if !self.directory.select(id) {
            return Vec::new();
        }
        self.sync_conversation().into_iter().collect()
    }

    /// Leave the current session for a fresh conversation. The conversation
    /// is reset even when no session was active, so an errored new chat can
    /// always be restarted.
    pub fn new_chat(&mut self) {
        self.directory.new_chat();
        self.conversation.switch_to(None);
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> Result<Command, RenameRejected> {
        self.directory.rename(id, title)
    }

    pub fn request_delete(&mut self, id: &str) {
        self.directory.request_delete(id);
    }

    pub fn cancel_delete(&mut self) {
        self.directory.cancel_delete();
    }

    pub fn confirm_delete(&mut self) -> Option<Command> {
        self.directory.confirm_delete()
    }

    // ── Conversation operations ───────────────────────────────────────

    pub fn send_message(&mut self, text: &str) -> Result<Command, SendRejected> {
        self.conversation.send(text)
    }

    // ── Auth ──────────────────────────────────────────────────────────

    /// Store the new identity and refetch the list for it.
    pub fn sign_in(&mut self, username: &str, token: Option<String>) -> Vec<Command> {
        info!("signed in as {username}");
        self.auth = AuthContext::signed_in(username, token);
        vec![self.directory.fetch()]
    }

    /// Forget the identity, the list and the active session. No network call.
    pub fn sign_out(&mut self) {
        info!("signed out");
        self.auth = AuthContext::Anonymous;
        self.directory.clear();
        self.conversation.switch_to(None);
    }

    // ── Results ───────────────────────────────────────────────────────

    /// Route a finished command to its controller and return follow-up work.
    pub fn apply_command_result<Tz: TimeZone>(
        &mut self,
        result: CommandResult,
        now: &DateTime<Tz>,
    ) -> Vec<Command> {
        let mut follow_up = Vec::new();
        match result {
            CommandResult::Sessions { epoch, result } => {
                self.directory.apply_sessions(epoch, result, now);
            }
            CommandResult::Renamed { snapshot, result } => {
                follow_up.extend(self.directory.apply_rename(snapshot, result));
            }
            CommandResult::Deleted { session_id, result } => {
                follow_up.extend(self.directory.apply_delete(&session_id, result));
            }
            CommandResult::ConversationLoaded { tag, result } => {
                self.conversation.apply_load(tag, result);
            }
            CommandResult::ChatReplied { tag, result } => {
                let directory = &mut self.directory;
                self.conversation.apply_send(tag, result, |id| {
                    follow_up.push(directory.handle_session_update(id));
                });
            }
        }
        follow_up.extend(self.sync_conversation());
        follow_up
    }

    /// Bring the conversation in line with the directory's active session.
    fn sync_conversation(&mut self) -> Option<Command> {
        let active = self.directory.active_session_id();
        if active == self.conversation.requested_session_id() {
            return None;
        }
        if active.is_some() && active == self.conversation.confirmed_session_id() {
            debug!("conversation adopts its own confirmed session id");
            self.conversation.adopt_confirmed_id();
            return None;
        }
        let active = active.map(str::to_string);
        self.conversation.switch_to(active)
    }
}

/// Run `commands` and every follow-up they produce, one at a time.
pub async fn drive<B: TutorBackend, Tz: TimeZone>(
    app: &mut App,
    backend: &B,
    commands: impl IntoIterator<Item = Command>,
    now: &DateTime<Tz>,
) {
    let mut queue: VecDeque<Command> = commands.into_iter().collect();
    while let Some(cmd) = queue.pop_front() {
        let result = execute(cmd, backend, app.auth()).await;
        queue.extend(app.apply_command_result(result, now));
    }
}
