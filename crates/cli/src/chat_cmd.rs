use std::io::Write as _;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tutorchat_controller::App;

use crate::context::CliContext;
use crate::render::{render_message, render_sessions, render_transcript};
use crate::session_cmd::confirm_delete_prompt;

const HELP: &str = "\
Commands:
  /new                  start a new chat
  /list                 refresh and show sessions
  /open <ID>            switch to a session
  /rename <ID> <TITLE>  rename a session
  /delete <ID>          delete a session
  /quit                 leave
Anything else is sent to the tutor.";

/// One line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Send(String),
    New,
    List,
    Open(String),
    Rename { id: String, title: String },
    Delete(String),
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplInput::Send(line.to_string());
    };
    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    match (name, args) {
        ("new", _) => ReplInput::New,
        ("list", _) => ReplInput::List,
        ("help", _) => ReplInput::Help,
        ("quit" | "exit", _) => ReplInput::Quit,
        ("open", id) if !id.is_empty() => ReplInput::Open(id.to_string()),
        ("delete", id) if !id.is_empty() => ReplInput::Delete(id.to_string()),
        ("rename", args) => match args.split_once(char::is_whitespace) {
            Some((id, title)) if !title.trim().is_empty() => ReplInput::Rename {
                id: id.to_string(),
                title: title.trim().to_string(),
            },
            _ => ReplInput::Invalid("usage: /rename <ID> <TITLE>".to_string()),
        },
        ("open" | "delete", _) => ReplInput::Invalid(format!("usage: /{name} <ID>")),
        _ => ReplInput::Invalid(format!("unknown command /{name}; try /help")),
    }
}

/// `tutorchat chat [--session ID]`
pub async fn run_chat(ctx: &CliContext, session: Option<&str>) -> Result<()> {
    let mut app = ctx.app();
    let mut commands = app.startup();
    if let Some(id) = session {
        commands.extend(app.select_session(id));
    }
    ctx.run(&mut app, commands).await;
    report_directory_error(&app);
    print_conversation(&app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&app)?;
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        match parse_line(&line) {
            ReplInput::Empty => {}
            ReplInput::Quit => break,
            ReplInput::Help => println!("{HELP}"),
            ReplInput::Invalid(msg) => eprintln!("{msg}"),
            ReplInput::Send(text) => send(ctx, &mut app, &text).await,
            ReplInput::New => {
                app.new_chat();
                print_conversation(&app);
            }
            ReplInput::List => {
                let fetch = app.directory.fetch();
                ctx.run(&mut app, [fetch]).await;
                report_directory_error(&app);
                println!(
                    "{}",
                    render_sessions(
                        app.directory.groups(),
                        app.directory.active_session_id(),
                        &Local::now()
                    )
                );
            }
            ReplInput::Open(id) => {
                let commands = app.select_session(&id);
                ctx.run(&mut app, commands).await;
                print_conversation(&app);
            }
            ReplInput::Rename { id, title } => match app.rename_session(&id, &title) {
                Ok(command) => {
                    ctx.run(&mut app, [command]).await;
                    if !report_directory_error(&app) {
                        println!("Renamed {id}.");
                    }
                }
                Err(e) => eprintln!("Rename skipped: {e}"),
            },
            ReplInput::Delete(id) => {
                let was_active = app.directory.active_session_id() == Some(id.as_str());
                if confirm_delete_prompt(&mut app, &id, false)?.is_none() {
                    println!("Cancelled.");
                    continue;
                }
                if let Some(command) = app.confirm_delete() {
                    ctx.run(&mut app, [command]).await;
                }
                if !report_directory_error(&app) {
                    println!("Deleted {id}.");
                    if was_active {
                        print_conversation(&app);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn send(ctx: &CliContext, app: &mut App, text: &str) {
    if app.conversation.is_input_disabled() {
        eprintln!("{}", app.conversation.input_placeholder());
        return;
    }
    let command = match app.send_message(text) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Not sent: {e}");
            return;
        }
    };
    let shown = app.conversation.transcript().len();
    if app.conversation.shows_thinking_indicator() {
        println!("...");
    }
    ctx.run(app, [command]).await;

    if let Some(err) = app.conversation.error() {
        eprintln!("{err}");
        return;
    }
    for message in app.conversation.transcript().iter().skip(shown) {
        if let Some(text) = render_message(message) {
            println!("{text}\n");
        }
    }
}

fn prompt(app: &App) -> Result<()> {
    let label = app
        .directory
        .active_session_id()
        .and_then(|id| app.directory.session(id))
        .map(|session| session.display_title())
        .unwrap_or_else(|| "new chat".to_string());
    print!("[{label}] {} > ", app.conversation.input_placeholder());
    std::io::stdout().flush().context("Failed to flush stdout")
}

fn print_conversation(app: &App) {
    if let Some(err) = app.conversation.error() {
        eprintln!("{err}");
        return;
    }
    println!("{}\n", render_transcript(app.conversation.transcript()));
}

/// Prints the directory's error, if any. Returns whether there was one.
fn report_directory_error(app: &App) -> bool {
    match app.directory.error() {
        Some(err) => {
            eprintln!("{err}");
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(
            parse_line("  teach me recursion "),
            ReplInput::Send("teach me recursion".to_string())
        );
        assert_eq!(parse_line("   "), ReplInput::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_line("/new"), ReplInput::New);
        assert_eq!(parse_line("/list"), ReplInput::List);
        assert_eq!(parse_line("/quit"), ReplInput::Quit);
        assert_eq!(parse_line("/open abc123"), ReplInput::Open("abc123".to_string()));
        assert_eq!(parse_line("/delete abc123"), ReplInput::Delete("abc123".to_string()));
        assert_eq!(
            parse_line("/rename abc123  Graph theory basics "),
            ReplInput::Rename {
                id: "abc123".to_string(),
                title: "Graph theory basics".to_string(),
            }
        );
    }

    #[test]
    fn malformed_commands_are_reported() {
        assert_eq!(
            parse_line("/open"),
            ReplInput::Invalid("usage: /open <ID>".to_string())
        );
        assert_eq!(
            parse_line("/rename abc123"),
            ReplInput::Invalid("usage: /rename <ID> <TITLE>".to_string())
        );
        assert!(matches!(parse_line("/frobnicate"), ReplInput::Invalid(_)));
    }
}
