use chrono::{DateTime, TimeZone};
use tracing::{debug, info, warn};

use tutorchat_api::{SessionListResponse, UpdateTitleResponse};
use tutorchat_api_client::ApiError;
use tutorchat_core::grouping::{group_sessions_by_time, GroupedSessions, SessionLocation};
use tutorchat_core::session::fallback_title;
use tutorchat_core::Session;

use crate::async_ops::Command;
use crate::error::RenameRejected;

pub const FETCH_FAILED: &str = "Failed to load chat history.";

/// Pre-rename state of one session, captured before the optimistic edit.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameSnapshot {
    pub session_id: String,
    /// Where the session sat at rename time.
    pub location: SessionLocation,
    pub original: Session,
}

/// The session list and the active session id.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    groups: GroupedSessions,
    active_session_id: Option<String>,
    loading: bool,
    error: Option<String>,
    pending_delete: Option<String>,
    /// Bumped when the list is cleared; older fetch results are dropped.
    epoch: u64,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &GroupedSessions {
        &self.groups
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.groups.get(id)
    }

    // ── Fetch ─────────────────────────────────────────────────────────

    pub fn fetch(&mut self) -> Command {
        self.loading = true;
        self.error = None;
        Command::FetchSessions { epoch: self.epoch }
    }

    /// Replace the list wholesale with a fetch result. A failure empties the
    /// list and records [`FETCH_FAILED`].
    pub fn apply_sessions<Tz: TimeZone>(
        &mut self,
        epoch: u64,
        result: Result<SessionListResponse, ApiError>,
        now: &DateTime<Tz>,
    ) {
        if epoch != self.epoch {
            debug!("dropping session list fetched before the list was cleared");
            return;
        }
        self.loading = false;
        match result {
            Ok(list) => {
                self.groups = group_sessions_by_time(list.sessions, now);
                self.error = None;
                debug!(
                    "fetched {} sessions in {} groups",
                    self.groups.len(),
                    self.groups.groups().len()
                );
            }
            Err(e) => {
                warn!("failed to fetch sessions: {e}");
                self.groups.clear();
                self.error = Some(FETCH_FAILED.to_string());
            }
        }
    }

    /// Empty the list and forget the active session without a network call.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.active_session_id = None;
        self.pending_delete = None;
        self.loading = false;
        self.error = None;
        self.epoch += 1;
    }

    // ── Rename ────────────────────────────────────────────────────────

    /// Apply `title` locally and return the update request.
    ///
    /// The title is trimmed. Blank titles, titles equal to the current one
    /// and sessions that are not listed are rejected without a request.
    /// Issuing a rename clears any earlier list-level error.
    pub fn rename(&mut self, id: &str, title: &str) -> Result<Command, RenameRejected> {
        let title = title.trim();
        if title.is_empty() {
            warn!("rename of {id} rejected: empty title");
            return Err(RenameRejected::EmptyTitle);
        }

        let (Some(location), Some(session)) = (self.groups.find(id), self.groups.get_mut(id))
        else {
            warn!("rename of {id} rejected: session is not listed");
            return Err(RenameRejected::NotListed);
        };
        if session.title == title {
            debug!("rename of {id} skipped: title unchanged");
            return Err(RenameRejected::Unchanged);
        }

        let original = session.clone();
        session.title = title.to_string();
        self.error = None;
        info!("renaming session {id} to {title:?}");

        Ok(Command::RenameSession {
            snapshot: RenameSnapshot {
                session_id: id.to_string(),
                location,
                original,
            },
            title: title.to_string(),
        })
    }

    /// Settle a rename. Success keeps the server's title and the existing
    /// `updated_at`. Failure restores the snapshot in place, or asks for a
    /// refetch when the session is no longer where it was.
    pub fn apply_rename(
        &mut self,
        snapshot: RenameSnapshot,
        result: Result<UpdateTitleResponse, ApiError>,
    ) -> Option<Command> {
        let id = snapshot.session_id.as_str();
        match result {
            Ok(confirmed) => {
                if let Some(session) = self.groups.get_mut(id) {
                    session.title = confirmed.title;
                }
                None
            }
            Err(e) => {
                warn!("failed to rename session {id}: {e}");
                self.error = Some(format!("Failed to rename session: {}", e.user_message()));
                if self.groups.find(id) == Some(snapshot.location) {
                    self.groups.replace_at(snapshot.location, snapshot.original);
                    None
                } else {
                    Some(self.fetch())
                }
            }
        }
    }

    // ── Delete ────────────────────────────────────────────────────────

    /// First phase: remember the candidate. No request, no list change.
    pub fn request_delete(&mut self, id: &str) {
        self.pending_delete = Some(id.to_string());
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Title to show in the delete confirmation.
    pub fn delete_candidate_title(&self) -> Option<String> {
        let id = self.pending_delete.as_deref()?;
        Some(
            self.groups
                .get(id)
                .map(Session::display_title)
                .unwrap_or_else(|| fallback_title(id)),
        )
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Second phase: dismiss the confirmation and return the delete request.
    pub fn confirm_delete(&mut self) -> Option<Command> {
        let session_id = self.pending_delete.take()?;
        self.error = None;
        info!("deleting session {session_id}");
        Some(Command::DeleteSession { session_id })
    }

    /// Settle a delete. Success refetches and leaves the deleted session if
    /// it was active. Failure keeps the list as is.
    pub fn apply_delete(&mut self, id: &str, result: Result<(), ApiError>) -> Option<Command> {
        match result {
            Ok(()) => {
                if self.active_session_id.as_deref() == Some(id) {
                    info!("deleted the active session, switching to a new chat");
                    self.active_session_id = None;
                }
                Some(self.fetch())
            }
            Err(e) => {
                warn!("failed to delete session {id}: {e}");
                self.error = Some(format!("Failed to delete session: {}", e.user_message()));
                None
            }
        }
    }

    // ── Selection ─────────────────────────────────────────────────────

    /// Make `id` active. Returns false when it already was.
    pub fn select(&mut self, id: &str) -> bool {
        if self.active_session_id.as_deref() == Some(id) {
            return false;
        }
        self.active_session_id = Some(id.to_string());
        true
    }

    /// Clear the active session. Returns false when none was active.
    pub fn new_chat(&mut self) -> bool {
        self.active_session_id.take().is_some()
    }

    /// A conversation confirmed `id`: refetch, and adopt it when nothing is active.
    pub fn handle_session_update(&mut self, id: &str) -> Command {
        if self.active_session_id.is_none() {
            debug!("adopting new session {id} as active");
            self.active_session_id = Some(id.to_string());
        }
        self.fetch()
    }
}
