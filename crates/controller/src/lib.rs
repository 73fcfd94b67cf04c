//! Client-side state for the tutoring chat.
//!
//! [`SessionDirectory`] owns the bucketed session list and the active
//! session id. [`Conversation`] owns one transcript, its protocol stage and
//! the session id it has confirmed with the server. The two only meet in
//! [`App`], which hands a newly confirmed id from the conversation to the
//! directory.
//!
//! Operations never touch the network directly. They update local state and
//! return [`Command`]s; [`execute`] runs a command against a
//! [`TutorBackend`](tutorchat_api_client::TutorBackend) and the resulting
//! [`CommandResult`] is fed back through [`App::apply_command_result`].

pub mod app;
pub mod async_ops;
pub mod conversation;
pub mod directory;
pub mod error;

pub use app::{drive, App};
pub use async_ops::{execute, Command, CommandResult};
pub use conversation::{Conversation, RequestTag};
pub use directory::{RenameSnapshot, SessionDirectory};
pub use error::{ChatFailure, RenameRejected, SendRejected};
