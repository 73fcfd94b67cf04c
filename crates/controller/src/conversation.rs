use tracing::{debug, info, warn};

use tutorchat_api::{ChatRequest, ChatResponse, SessionDetailResponse};
use tutorchat_api_client::ApiError;
use tutorchat_core::{Message, Stage};

use crate::async_ops::Command;
use crate::error::{failure_stage, ChatFailure, SendRejected};

pub const LOAD_FAILED: &str = "Failed to load chat session.";

/// Identity a conversation request was issued against.
///
/// A completion is applied only while both fields still match the
/// conversation; anything else belongs to a conversation that has since been
/// replaced and is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    pub generation: u64,
    pub requested_session_id: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct InFlightSend {
    /// Transcript length before the optimistic user entry.
    len_before: usize,
    /// Whether the entry before the user's message was already the explaining banner.
    previous_was_banner: bool,
}

/// One conversation: transcript, protocol stage and session identity.
///
/// `requested_session_id` is what the directory asked for. `confirmed_session_id`
/// is what this conversation has itself seen the server acknowledge, through a
/// successful load or send.
#[derive(Debug)]
pub struct Conversation {
    generation: u64,
    requested_session_id: Option<String>,
    confirmed_session_id: Option<String>,
    transcript: Vec<Message>,
    stage: Stage,
    loading: bool,
    in_flight_send: Option<InFlightSend>,
    error: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new_chat()
    }
}

impl Conversation {
    /// Fresh "new chat" state: a single welcome entry, stage START, no id.
    pub fn new_chat() -> Self {
        Self {
            generation: 0,
            requested_session_id: None,
            confirmed_session_id: None,
            transcript: vec![Message::welcome()],
            stage: Stage::Start,
            loading: false,
            in_flight_send: None,
            error: None,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn requested_session_id(&self) -> Option<&str> {
        self.requested_session_id.as_deref()
    }

    pub fn confirmed_session_id(&self) -> Option<&str> {
        self.confirmed_session_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight_send.is_some()
    }

    fn tag(&self) -> RequestTag {
        RequestTag {
            generation: self.generation,
            requested_session_id: self.requested_session_id.clone(),
        }
    }

    fn is_current(&self, tag: &RequestTag) -> bool {
        tag.generation == self.generation && tag.requested_session_id == self.requested_session_id
    }

    // ── Session switching ─────────────────────────────────────────────

    /// Replace the whole conversation for a new requested id.
    ///
    /// `None` starts a new chat locally. `Some(id)` clears everything and
    /// returns the load request. In-flight requests of the previous
    /// conversation are not cancelled; their results will no longer match.
    pub fn switch_to(&mut self, requested: Option<String>) -> Option<Command> {
        let generation = self.generation + 1;
        *self = Self::new_chat();
        self.generation = generation;
        self.requested_session_id = requested;

        let session_id = self.requested_session_id.clone()?;
        debug!("loading history for session {session_id}");
        self.transcript.clear();
        self.loading = true;
        Some(Command::LoadConversation {
            tag: self.tag(),
            session_id,
        })
    }

    /// Take on the id this conversation confirmed itself as its requested id,
    /// without reloading.
    pub fn adopt_confirmed_id(&mut self) {
        if self.requested_session_id.is_none() {
            self.requested_session_id = self.confirmed_session_id.clone();
        }
    }

    pub fn apply_load(
        &mut self,
        tag: RequestTag,
        result: Result<SessionDetailResponse, ApiError>,
    ) -> bool {
        if !self.is_current(&tag) {
            debug!(
                "dropping stale history for {:?}",
                tag.requested_session_id.as_deref()
            );
            return false;
        }
        self.loading = false;

        match result {
            Ok(detail) => {
                self.transcript = detail.history.into_iter().map(Message::retagged).collect();
                self.stage = detail.current_stage.unwrap_or_default();
                self.confirmed_session_id = tag.requested_session_id;
                self.error = None;
            }
            Err(e) => {
                warn!("failed to load session history: {e}");
                self.transcript.clear();
                self.stage = Stage::Error;
                self.error = Some(
                    e.server_body()
                        .and_then(|body| body.error_message())
                        .unwrap_or(LOAD_FAILED)
                        .to_string(),
                );
            }
        }
        true
    }

    // ── Sending ───────────────────────────────────────────────────────

    /// Append the user's message optimistically and return the chat request.
    pub fn send(&mut self, text: &str) -> Result<Command, SendRejected> {
        let text = text.trim();
        let rejection = if text.is_empty() {
            Some(SendRejected::EmptyInput)
        } else if self.loading || self.in_flight_send.is_some() {
            Some(SendRejected::Busy)
        } else if self.stage.is_error() {
            Some(SendRejected::Errored)
        } else if self.awaiting_session_id() {
            Some(SendRejected::AwaitingSessionId)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            warn!("send blocked: {rejection}");
            return Err(rejection);
        }

        self.in_flight_send = Some(InFlightSend {
            len_before: self.transcript.len(),
            previous_was_banner: self
                .transcript
                .last()
                .is_some_and(Message::is_explaining_banner),
        });
        self.transcript.push(Message::user(text));
        self.error = None;

        Ok(Command::SendChat {
            tag: self.tag(),
            request: ChatRequest {
                user_message: text.to_string(),
                session_id: self.confirmed_session_id.clone(),
            },
        })
    }

    /// Settle a chat turn.
    ///
    /// On success the signals are applied in order (stage, syllabus, banner,
    /// reply) and the returned session id becomes the confirmed id. `notify`
    /// receives that id before the conversation stops being pending.
    /// Returns false when the result was stale and ignored.
    pub fn apply_send(
        &mut self,
        tag: RequestTag,
        result: Result<ChatResponse, ApiError>,
        notify: impl FnOnce(&str),
    ) -> bool {
        if !self.is_current(&tag) {
            debug!("dropping stale chat reply");
            return false;
        }
        let Some(in_flight) = self.in_flight_send else {
            debug!("dropping chat reply with no send in flight");
            return false;
        };

        match result {
            Ok(response) => {
                self.apply_reply(&response, in_flight);
                if let Some(id) = response.confirmed_session_id() {
                    if self.confirmed_session_id.as_deref() != Some(id) {
                        info!("conversation confirmed session {id}");
                    }
                    self.confirmed_session_id = Some(id.to_string());
                    notify(id);
                }
            }
            Err(e) => {
                let failure = ChatFailure::from_api(&e);
                warn!("chat turn failed: {e}");
                self.stage = failure_stage(&e);
                if self.transcript.len() > in_flight.len_before
                    && self.transcript.last().is_some_and(Message::is_user)
                {
                    self.transcript.pop();
                }
                self.error = Some(failure.to_string());
            }
        }

        self.in_flight_send = None;
        true
    }

    fn apply_reply(&mut self, response: &ChatResponse, in_flight: InFlightSend) {
        if let Some(stage) = response.stage() {
            self.stage = stage.clone();
        }
        if let Some(state) = &response.new_state {
            if let Some(syllabus) = state.syllabus() {
                self.transcript.push(Message::syllabus(syllabus.clone()));
            }
            if state.transitions_to_explainer() && !in_flight.previous_was_banner {
                self.transcript.push(Message::banner());
            }
        }
        if let Some(reply) = response.reply() {
            self.transcript.push(Message::ai(reply.clone()));
        }
    }

    // ── Derived predicates ────────────────────────────────────────────

    /// No id yet although the first turn is already in the transcript.
    ///
    /// This relies on a fresh conversation holding exactly one welcome entry.
    fn awaiting_session_id(&self) -> bool {
        self.confirmed_session_id.is_none() && self.transcript.len() > 1
    }

    pub fn is_input_disabled(&self) -> bool {
        self.loading
            || self.in_flight_send.is_some()
            || self.stage.is_error()
            || self.awaiting_session_id()
    }

    pub fn can_submit(&self, text: &str) -> bool {
        !self.is_input_disabled() && !text.trim().is_empty()
    }

    pub fn input_placeholder(&self) -> &'static str {
        self.stage.input_placeholder()
    }

    /// History is being fetched and nothing is shown yet.
    pub fn shows_history_spinner(&self) -> bool {
        self.loading && self.transcript.is_empty()
    }

    /// A reply is awaited below existing messages.
    pub fn shows_thinking_indicator(&self) -> bool {
        self.in_flight_send.is_some() && !self.transcript.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tutorchat_api::{NewState, ServerErrorBody};
    use tutorchat_core::{testing, MessageKind, Role};

    fn send_tag(cmd: Command) -> (RequestTag, ChatRequest) {
        match cmd {
            Command::SendChat { tag, request } => (tag, request),
            other => panic!("expected send, got {other:?}"),
        }
    }

    fn load_tag(cmd: Option<Command>) -> RequestTag {
        match cmd {
            Some(Command::LoadConversation { tag, .. }) => tag,
            other => panic!("expected load, got {other:?}"),
        }
    }

    fn reply(session_id: &str, stage: &str) -> ChatResponse {
        ChatResponse {
            ai_reply: Some(json!("Great, let's plan.")),
            new_state: Some(NewState {
                stage: Some(Stage::from(stage)),
                ..Default::default()
            }),
            session_id: Some(session_id.to_string()),
        }
    }

    fn loaded(id: &str) -> Conversation {
        let mut conv = Conversation::new_chat();
        let tag = load_tag(conv.switch_to(Some(id.to_string())));
        conv.apply_load(
            tag,
            Ok(SessionDetailResponse {
                session_id: Some(id.to_string()),
                history: testing::history("teach me graphs", "Sure"),
                current_stage: Some(Stage::Explaining),
            }),
        );
        conv
    }

    #[test]
    fn new_chat_shows_welcome() {
        let conv = Conversation::new_chat();
        assert_eq!(conv.transcript(), &[Message::welcome()]);
        assert_eq!(conv.stage(), &Stage::Start);
        assert!(conv.confirmed_session_id().is_none());
        assert!(!conv.is_input_disabled());
        assert_eq!(conv.input_placeholder(), "Describe what you want to learn...");
    }

    #[test]
    fn first_turn_mints_session_and_notifies() {
        let mut conv = Conversation::new_chat();
        let (tag, request) = send_tag(conv.send("I want to learn recursion").expect("accepted"));
        assert_eq!(request.session_id, None);
        assert_eq!(conv.transcript().len(), 2);
        assert!(conv.is_pending());
        assert!(conv.shows_thinking_indicator());

        let mut notified = Vec::new();
        let applied = conv.apply_send(tag, Ok(reply("abc123", "NEGOTIATING")), |id| {
            notified.push(id.to_string());
        });

        assert!(applied);
        assert_eq!(conv.stage(), &Stage::Negotiating);
        assert_eq!(conv.confirmed_session_id(), Some("abc123"));
        assert_eq!(notified, vec!["abc123".to_string()]);
        assert!(!conv.is_pending());
        assert_eq!(conv.transcript().len(), 3);
        assert_eq!(conv.transcript()[2].role, Role::Ai);
        assert!(conv.transcript()[2].kind.is_none());
    }

    #[test]
    fn second_send_without_id_is_rejected() {
        let mut conv = Conversation::new_chat();
        let (tag, _) = send_tag(conv.send("first").expect("accepted"));
        assert_eq!(conv.send("again"), Err(SendRejected::Busy));

        // Reply arrives without a session id: the heuristic now blocks sends.
        conv.apply_send(
            tag,
            Ok(ChatResponse {
                ai_reply: Some(json!("ok")),
                ..Default::default()
            }),
            |_| panic!("no id to notify"),
        );
        assert_eq!(conv.send("again"), Err(SendRejected::AwaitingSessionId));
        assert!(conv.is_input_disabled());
    }

    #[test]
    fn blank_send_is_rejected_without_change() {
        let mut conv = Conversation::new_chat();
        assert_eq!(conv.send("   "), Err(SendRejected::EmptyInput));
        assert_eq!(conv.transcript().len(), 1);
        assert!(!conv.can_submit(" "));
        assert!(conv.can_submit("hi"));
    }

    #[test]
    fn failed_send_rolls_back_to_previous_length() {
        let mut conv = loaded("abc123");
        let before = conv.transcript().to_vec();
        let (tag, request) = send_tag(conv.send("what is a cycle?").expect("accepted"));
        assert_eq!(request.session_id.as_deref(), Some("abc123"));

        conv.apply_send(tag, Err(ApiError::Transport("refused".into())), |_| {
            panic!("failed sends do not notify")
        });

        assert_eq!(conv.transcript(), before.as_slice());
        assert_eq!(conv.stage(), &Stage::Error);
        assert_eq!(conv.error(), Some("Cannot reach server."));
        assert!(conv.is_input_disabled());
        assert_eq!(
            conv.input_placeholder(),
            "An error occurred. Try starting a new chat."
        );
    }

    #[test]
    fn errored_conversation_rejects_further_sends() {
        let mut conv = Conversation::new_chat();
        let (tag, _) = send_tag(conv.send("hi").expect("accepted"));
        conv.apply_send(tag, Ok(reply("s1", "NEGOTIATING")), |_| {});
        let (tag, _) = send_tag(conv.send("again").expect("accepted"));
        conv.apply_send(tag, Err(ApiError::Transport("refused".into())), |_| {});
        assert_eq!(conv.stage(), &Stage::Error);
        let before = conv.transcript().to_vec();

        assert_eq!(conv.send("retry"), Err(SendRejected::Errored));
        assert_eq!(conv.transcript(), before.as_slice());
        assert_eq!(conv.stage(), &Stage::Error);
        assert!(!conv.is_pending());

        conv.switch_to(None);
        assert!(conv.send("fresh start").is_ok());
    }

    #[test]
    fn failed_send_keeps_server_named_stage() {
        let mut conv = loaded("abc123");
        let (tag, _) = send_tag(conv.send("hello").expect("accepted"));
        let err = ApiError::Server {
            status: 500,
            body: ServerErrorBody::from_bytes(
                br#"{"ai_reply":"[SYSTEM ERROR]","new_state":{"stage":"NEGOTIATING"}}"#,
            ),
        };
        conv.apply_send(tag, Err(err), |_| {});
        assert_eq!(conv.stage(), &Stage::Negotiating);
        assert_eq!(conv.error(), Some("AI Error: [SYSTEM ERROR]"));
    }

    #[test]
    fn signals_append_syllabus_then_banner_then_reply() {
        let mut conv = loaded("abc123");
        let (tag, _) = send_tag(conv.send("sounds good").expect("accepted"));
        conv.apply_send(
            tag,
            Ok(ChatResponse {
                ai_reply: Some(json!("Let's begin.")),
                new_state: Some(NewState {
                    stage: Some(Stage::Explaining),
                    display_syllabus: Some(json!("<syllabus>Topic: Graphs</syllabus>")),
                    transition_to_explainer: Some(json!(true)),
                }),
                session_id: Some("abc123".into()),
            }),
            |_| {},
        );

        let tail: Vec<_> = conv.transcript()[3..]
            .iter()
            .map(|m| (m.role.clone(), m.kind.clone()))
            .collect();
        assert_eq!(
            tail,
            vec![
                (Role::System, Some(MessageKind::Syllabus)),
                (Role::System, Some(MessageKind::Info)),
                (Role::Ai, None),
            ]
        );
        assert_eq!(conv.input_placeholder(), "Ask about the current topic...");
    }

    #[test]
    fn repeated_transition_signal_does_not_duplicate_banner() {
        let mut conv = loaded("abc123");
        let transition = || ChatResponse {
            ai_reply: None,
            new_state: Some(NewState {
                transition_to_explainer: Some(json!(true)),
                ..Default::default()
            }),
            session_id: Some("abc123".into()),
        };

        let (tag, _) = send_tag(conv.send("go").expect("accepted"));
        conv.apply_send(tag, Ok(transition()), |_| {});
        assert!(conv.transcript().last().is_some_and(Message::is_explaining_banner));
        let len = conv.transcript().len();

        let (tag, _) = send_tag(conv.send("again").expect("accepted"));
        conv.apply_send(tag, Ok(transition()), |_| {});
        assert_eq!(conv.transcript().len(), len + 1);
        assert!(conv.transcript().last().is_some_and(Message::is_user));
    }

    #[test]
    fn load_retags_history_and_confirms_id() {
        let conv = loaded("abc123");
        assert_eq!(conv.confirmed_session_id(), Some("abc123"));
        assert_eq!(conv.stage(), &Stage::Explaining);
        assert_eq!(conv.transcript()[0].kind, Some(MessageKind::Message));
        assert!(conv.transcript()[1].kind.is_none());
    }

    #[test]
    fn load_without_stage_defaults_to_start() {
        let mut conv = Conversation::new_chat();
        let tag = load_tag(conv.switch_to(Some("s1".into())));
        assert!(conv.shows_history_spinner());
        conv.apply_load(
            tag,
            Ok(SessionDetailResponse {
                session_id: None,
                history: Vec::new(),
                current_stage: None,
            }),
        );
        assert_eq!(conv.stage(), &Stage::Start);
    }

    #[test]
    fn failed_load_leaves_id_unconfirmed() {
        let mut conv = Conversation::new_chat();
        let tag = load_tag(conv.switch_to(Some("gone".into())));
        assert!(conv.is_input_disabled());
        conv.apply_load(
            tag,
            Err(ApiError::Server {
                status: 404,
                body: ServerErrorBody::from_bytes(br#"{"error":"Session not found"}"#),
            }),
        );
        assert!(conv.confirmed_session_id().is_none());
        assert!(conv.transcript().is_empty());
        assert_eq!(conv.stage(), &Stage::Error);
        assert_eq!(conv.error(), Some("Session not found"));

        let tag = load_tag(conv.switch_to(Some("gone".into())));
        conv.apply_load(tag, Err(ApiError::Transport("refused".into())));
        assert_eq!(conv.error(), Some(LOAD_FAILED));
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut conv = Conversation::new_chat();
        let old = load_tag(conv.switch_to(Some("a".into())));
        let current = load_tag(conv.switch_to(Some("b".into())));

        let stale = conv.apply_load(
            old,
            Ok(SessionDetailResponse {
                session_id: Some("a".into()),
                history: testing::history("from a", "reply a"),
                current_stage: Some(Stage::Explaining),
            }),
        );
        assert!(!stale);
        assert!(conv.is_loading());
        assert!(conv.transcript().is_empty());

        assert!(conv.apply_load(
            current,
            Ok(SessionDetailResponse {
                session_id: Some("b".into()),
                history: Vec::new(),
                current_stage: None,
            }),
        ));
        assert_eq!(conv.confirmed_session_id(), Some("b"));
    }

    #[test]
    fn stale_send_is_discarded_after_switch() {
        let mut conv = Conversation::new_chat();
        let (tag, _) = send_tag(conv.send("hello").expect("accepted"));
        conv.switch_to(None);

        let applied = conv.apply_send(tag, Ok(reply("abc123", "NEGOTIATING")), |_| {
            panic!("stale replies do not notify")
        });
        assert!(!applied);
        assert_eq!(conv.transcript(), &[Message::welcome()]);
        assert!(conv.confirmed_session_id().is_none());
        assert!(!conv.is_pending());
    }

    #[test]
    fn adopting_confirmed_id_keeps_transcript() {
        let mut conv = Conversation::new_chat();
        let (tag, _) = send_tag(conv.send("hello").expect("accepted"));
        conv.apply_send(tag, Ok(reply("abc123", "NEGOTIATING")), |_| {});
        let transcript = conv.transcript().to_vec();

        conv.adopt_confirmed_id();
        assert_eq!(conv.requested_session_id(), Some("abc123"));
        assert_eq!(conv.transcript(), transcript.as_slice());
        assert!(conv.send("next").is_ok());
    }
}
