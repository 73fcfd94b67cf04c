use anyhow::{bail, Result};
use chrono::Local;
use dialoguer::Confirm;
use tutorchat_controller::App;

use crate::context::CliContext;
use crate::render::{render_sessions, render_transcript};

async fn fetched_app(ctx: &CliContext) -> Result<App> {
    let mut app = ctx.app();
    let commands = app.startup();
    ctx.run(&mut app, commands).await;
    if let Some(err) = app.directory.error() {
        bail!("{err}");
    }
    Ok(app)
}

/// `tutorchat sessions`
pub async fn run_sessions(ctx: &CliContext) -> Result<()> {
    let app = fetched_app(ctx).await?;
    println!("{}", render_sessions(app.directory.groups(), None, &Local::now()));
    Ok(())
}

/// `tutorchat show <ID>`
pub async fn run_show(ctx: &CliContext, id: &str) -> Result<()> {
    let mut app = ctx.app();
    let commands = app.select_session(id);
    ctx.run(&mut app, commands).await;
    if let Some(err) = app.conversation.error() {
        bail!("{err}");
    }
    println!("Stage: {}\n", app.conversation.stage());
    println!("{}", render_transcript(app.conversation.transcript()));
    Ok(())
}

/// `tutorchat rename <ID> <TITLE...>`
pub async fn run_rename(ctx: &CliContext, id: &str, title: &str) -> Result<()> {
    let mut app = fetched_app(ctx).await?;
    let command = app.rename_session(id, title)?;
    ctx.run(&mut app, [command]).await;
    if let Some(err) = app.directory.error() {
        bail!("{err}");
    }
    let confirmed = app
        .directory
        .session(id)
        .map(|session| session.display_title())
        .unwrap_or_else(|| title.trim().to_string());
    println!("Renamed {id} to \"{confirmed}\"");
    Ok(())
}

/// `tutorchat delete <ID> [--yes]`
pub async fn run_delete(ctx: &CliContext, id: &str, yes: bool) -> Result<()> {
    let mut app = fetched_app(ctx).await?;
    let Some(title) = confirm_delete_prompt(&mut app, id, yes)? else {
        println!("Cancelled.");
        return Ok(());
    };
    if let Some(command) = app.confirm_delete() {
        ctx.run(&mut app, [command]).await;
    }
    if let Some(err) = app.directory.error() {
        bail!("{err}");
    }
    println!("Deleted \"{title}\"");
    Ok(())
}

/// First phase of a delete. Returns the candidate's title when the user
/// confirmed, leaving the request pending; cancels it otherwise.
pub fn confirm_delete_prompt(app: &mut App, id: &str, yes: bool) -> Result<Option<String>> {
    app.request_delete(id);
    let title = app
        .directory
        .delete_candidate_title()
        .unwrap_or_else(|| id.to_string());
    let confirmed = yes
        || Confirm::new()
            .with_prompt(format!("Delete \"{title}\"? This cannot be undone."))
            .default(false)
            .interact()?;
    if confirmed {
        Ok(Some(title))
    } else {
        app.cancel_delete();
        Ok(None)
    }
}
