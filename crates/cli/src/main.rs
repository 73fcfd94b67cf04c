mod chat_cmd;
mod config;
mod context;
mod render;
mod session_cmd;

use clap::{Parser, Subcommand};

use crate::config::ConfigUpdate;
use crate::context::CliContext;

#[derive(Parser)]
#[command(name = "tutorchat", about = "tutorchat CLI - browse and continue tutoring sessions")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the configured API base URL for this run
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions grouped by recency
    Sessions,

    /// Print a session's transcript
    Show {
        /// Session ID
        id: String,
    },

    /// Rename a session
    Rename {
        /// Session ID
        id: String,
        /// New title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Delete a session
    Delete {
        /// Session ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Start an interactive chat
    Chat {
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },

    /// Show or set configuration (`--server` sets the stored URL)
    Config {
        /// Set the bearer token
        #[arg(long)]
        token: Option<String>,

        /// Set the username
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Config { token, username } = cli.command {
        let update = ConfigUpdate {
            server: cli.server,
            token,
            username,
        };
        return if update.is_empty() {
            config::show_config()
        } else {
            config::set_config(update)
        };
    }

    let config = config::load_config()?;
    let ctx = CliContext::from_config(&config, cli.server.as_deref())?;

    match cli.command {
        Commands::Sessions => session_cmd::run_sessions(&ctx).await,
        Commands::Show { id } => session_cmd::run_show(&ctx, &id).await,
        Commands::Rename { id, title } => {
            session_cmd::run_rename(&ctx, &id, &title.join(" ")).await
        }
        Commands::Delete { id, yes } => session_cmd::run_delete(&ctx, &id, yes).await,
        Commands::Chat { session } => chat_cmd::run_chat(&ctx, session.as_deref()).await,
        Commands::Config { .. } => Ok(()),
    }
}
