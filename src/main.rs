//! chat-session - command-line client for the chat integration API
//!
//! Resumes the device's chat, streams messages and sends replies.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_session::config::Config;

#[derive(Parser)]
#[command(name = "chat-session")]
#[command(about = "Command-line client for the chat integration API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides config.toml)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Integration API key (overrides config.toml)
    #[arg(long, global = true)]
    key: Option<String>,

    /// Display name shown to operators (overrides config.toml)
    #[arg(long, global = true)]
    name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session, print messages and send each stdin line
    Connect,

    /// Send a single message
    ///
    /// Runs the full session handshake (including the realtime join) to
    /// resolve the chat identity, sends, then disconnects.
    Send {
        /// Message content
        message: String,
    },

    /// Print stored messages
    ///
    /// Runs the full session handshake (including the realtime join) to
    /// resolve the chat identity, fetches one page, then disconnects.
    History {
        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Continue from a pagination cursor
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Upload a file and send it as a message
    Upload {
        /// File to upload
        path: PathBuf,

        /// MIME type (guessed from the extension if omitted)
        #[arg(long)]
        mime: Option<String>,

        /// Caption sent along with the attachment
        #[arg(short, long)]
        caption: Option<String>,
    },

    /// Show the stored chat identity for this endpoint, key and name
    Identity,

    /// Forget the stored chat identity; the next session starts a new chat
    Forget,

    /// Save --endpoint, --key and --name to config.toml
    Configure,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(key) = cli.key {
        config.credential = Some(key);
    }
    if let Some(name) = cli.name {
        config.display_name = name;
    }

    match cli.command {
        Commands::Connect => {
            commands::connect(&config).await?;
        }
        Commands::Send { message } => {
            tracing::info!("Sending message...");
            commands::send(&config, &message).await?;
        }
        Commands::History { limit, cursor } => {
            commands::history(&config, limit, cursor.as_deref()).await?;
        }
        Commands::Upload {
            path,
            mime,
            caption,
        } => {
            commands::upload(&config, &path, mime.as_deref(), caption.as_deref()).await?;
        }
        Commands::Identity => {
            commands::show_identity(&config)?;
        }
        Commands::Forget => {
            commands::forget(&config)?;
        }
        Commands::Configure => {
            config.save()?;
            println!("Configuration saved to {}", Config::config_dir()?.display());
        }
    }

    Ok(())
}
