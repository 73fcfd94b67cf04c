use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Short recency label for a session row.
///
/// Less than a day old and on the same day of month: clock time (`2:05 PM`).
/// Less than a week old: weekday name. Otherwise: `Jun 3`. Missing
/// timestamps produce an empty label.
pub fn format_session_time<Tz: TimeZone>(
    updated_at: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(updated_at) = updated_at else {
        return String::new();
    };
    let local = updated_at.with_timezone(&now.timezone());
    let age = now.clone().with_timezone(&Utc) - updated_at;

    if age.num_hours() < 24 && now.day() == local.day() {
        local.format("%-I:%M %p").to_string()
    } else if age.num_hours() < 168 {
        local.format("%A").to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}
