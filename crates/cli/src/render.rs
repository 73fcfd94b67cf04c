use chrono::{DateTime, TimeZone};
use tutorchat_core::{
    classify, format_session_time, GroupedSessions, LiteralReason, Message, Rendering,
    SyllabusLine, SyllabusView,
};

/// Plain-text form of one transcript entry. `None` when it is hidden.
pub fn render_message(message: &Message) -> Option<String> {
    match classify(message) {
        Rendering::Hidden => None,
        Rendering::Banner { text } => Some(text),
        Rendering::Syllabus(view) => Some(render_syllabus(&view)),
        Rendering::Literal { text, reason } => Some(match reason {
            LiteralReason::UserInput => format!("You: {text}"),
            LiteralReason::UnsafeMarkup => format!("Tutor (shown as plain text):\n{text}"),
            LiteralReason::Fallback => format!("[{}] {text}", message.role.as_str()),
        }),
        Rendering::RichText { markdown } => Some(format!("Tutor: {markdown}")),
    }
}

fn render_syllabus(view: &SyllabusView) -> String {
    let mut out = format!("== {} ==", view.heading);
    for line in &view.lines {
        out.push_str(&match line {
            SyllabusLine::Phase { text } => format!("\n\n## {text}"),
            SyllabusLine::Topic { text } => format!("\n  * {text}"),
            SyllabusLine::Detail { label, value } => format!("\n      {label}: {value}"),
            SyllabusLine::Other { text } => format!("\n  {text}"),
        });
    }
    out
}

/// Every visible entry, separated by blank lines.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(render_message)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Bucketed session list; the active session is marked with `>`.
pub fn render_sessions<Tz: TimeZone>(
    groups: &GroupedSessions,
    active: Option<&str>,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if groups.is_empty() {
        return "No sessions yet.".to_string();
    }
    let mut out = String::new();
    for group in groups {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&group.bucket.label());
        out.push('\n');
        for session in &group.sessions {
            let marker = if active == Some(session.id.as_str()) { '>' } else { ' ' };
            out.push_str(&format!(
                "{marker} {:<12} {:<40} {}\n",
                session.id,
                session.display_title(),
                format_session_time(session.updated_at, now)
            ));
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tutorchat_core::{group_sessions_by_time, testing, MessageKind, Role};

    #[test]
    fn hidden_entries_render_nothing() {
        let internal = Message::new(Role::Ai, Some(MessageKind::Internal), "state dump");
        assert_eq!(render_message(&internal), None);
        assert_eq!(render_message(&Message::ai(json!(null))), None);
    }

    #[test]
    fn user_and_tutor_lines() {
        assert_eq!(
            render_message(&Message::user("hi")).as_deref(),
            Some("You: hi")
        );
        assert_eq!(
            render_message(&Message::ai(json!("**Recursion** is..."))).as_deref(),
            Some("Tutor: **Recursion** is...")
        );
        let unsafe_reply = Message::ai(json!("<img src=x onerror=alert(1)>"));
        assert!(
            render_message(&unsafe_reply)
                .expect("visible")
                .starts_with("Tutor (shown as plain text):")
        );
    }

    #[test]
    fn syllabus_is_laid_out() {
        let message = Message::syllabus(json!(
            "<syllabus>\nPhase 1: Basics\nTopic: Base case\nObjective: stop the recursion\n</syllabus>"
        ));
        assert_eq!(
            render_message(&message).as_deref(),
            Some(
                "== Syllabus Draft/Update ==\n\n## Phase 1: Basics\n  * Topic: Base case\n      Objective: stop the recursion"
            )
        );
    }

    #[test]
    fn transcript_skips_hidden_entries() {
        let messages = vec![
            Message::welcome(),
            Message::new(Role::Ai, Some(MessageKind::Internal), "x"),
            Message::banner(),
        ];
        let text = render_transcript(&messages);
        assert_eq!(text.split("\n\n").count(), 2);
        assert!(text.ends_with("--- Starting Learning Session ---"));
    }

    #[test]
    fn sessions_are_grouped_and_marked() {
        let now = testing::now();
        let groups = group_sessions_by_time(
            vec![
                testing::session("a1", "Graphs", 0),
                testing::session("b2", "", 1),
            ],
            &now,
        );
        let text = render_sessions(&groups, Some("b2"), &now);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Today");
        assert!(lines[1].starts_with("  a1"));
        assert!(lines[1].contains("Graphs"));
        assert_eq!(lines[3], "Yesterday");
        assert!(lines[4].starts_with("> b2"));
        assert!(lines[4].contains("Chat b2..."));
    }

    #[test]
    fn empty_list_message() {
        assert_eq!(
            render_sessions(&GroupedSessions::default(), None, &testing::now()),
            "No sessions yet."
        );
    }
}
