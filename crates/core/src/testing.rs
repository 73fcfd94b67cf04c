use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::{Message, Session};

/// Fixed "now" used across tests: 2024-06-15 14:00 at UTC+02:00.
pub fn now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .and_then(|zone| zone.with_ymd_and_hms(2024, 6, 15, 14, 0, 0).single())
        .unwrap_or_else(|| panic!("valid fixture instant"))
}

/// UTC instant `days` days and `hours` hours before [`now`].
pub fn ago(days: i64, hours: i64) -> DateTime<Utc> {
    now().with_timezone(&Utc) - chrono::Duration::days(days) - chrono::Duration::hours(hours)
}

/// Titled session updated `days` days before [`now`].
pub fn session(id: &str, title: &str, days: i64) -> Session {
    Session::new(id, title).with_updated_at(ago(days, 0))
}

/// Session without any timestamp.
pub fn undated_session(id: &str) -> Session {
    Session::new(id, "")
}

/// A loaded history: user turn followed by an untagged model reply.
pub fn history(user: &str, reply: &str) -> Vec<Message> {
    vec![
        Message::new(crate::Role::User, None, user),
        Message::new(crate::Role::Model, None, reply),
    ]
}
