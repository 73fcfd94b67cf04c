pub mod auth;
pub mod classify;
pub mod grouping;
pub mod message;
pub mod session;
pub mod stage;
pub mod time_label;

pub use auth::AuthContext;
pub use classify::{classify, LiteralReason, Rendering, SyllabusLine, SyllabusView};
pub use grouping::{group_sessions_by_time, GroupedSessions, SessionGroup, SessionLocation, TimeBucket};
pub use message::{Message, MessageContent, MessageKind, Role};
pub use session::Session;
pub use stage::Stage;
pub use time_label::format_session_time;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
