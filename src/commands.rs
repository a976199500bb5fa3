//! Command implementations (print to stdout)

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_session::config::Config;
use chat_session::identity::{FileStore, IdentityStore};
use chat_session::models::Message;
use chat_session::transport::{HttpTransport, SocketIoChannel};
use chat_session::{SessionClient, SessionEvent};

fn identity_store() -> Result<IdentityStore> {
    Ok(IdentityStore::new(Arc::new(FileStore::open_default()?)))
}

fn build_client(config: &Config) -> Result<SessionClient> {
    let options = config.session_options()?;
    let requests = HttpTransport::new(&options.endpoint, &options.credential);
    let channel = SocketIoChannel::new(&options.endpoint, &options.credential);
    Ok(SessionClient::new(
        options,
        identity_store()?,
        Arc::new(requests),
        Arc::new(channel),
    ))
}

/// Start a session or fail with a readable error.
async fn start(config: &Config) -> Result<SessionClient> {
    let client = build_client(config)?;
    client
        .start()
        .await
        .context("Failed to start chat session")?;
    Ok(client)
}

fn print_message(msg: &Message) {
    let time = msg.created_at.format("%Y-%m-%d %H:%M");
    println!("[{}] {}: {}", time, msg.role.as_str(), msg.content);
    if let Some(ref caption) = msg.caption {
        if !caption.trim().is_empty() {
            println!("  {}", caption.trim());
        }
    }
}

/// Stream the chat: print incoming messages, send each stdin line.
pub async fn connect(config: &Config) -> Result<()> {
    let client = build_client(config)?;

    client.on_message(print_message);
    client.subscribe(|event| match event {
        SessionEvent::ConnectionChanged(state) => {
            tracing::info!("Connection {}", state.as_str());
        }
        SessionEvent::ChatUpdated(chat) => {
            let status = chat.status.as_deref().unwrap_or("updated");
            println!("(chat {} is {})", chat.id, status);
        }
        SessionEvent::Typing(true) => println!("(typing...)"),
        SessionEvent::Warning(detail) => eprintln!("warning: {}", detail),
        _ => {}
    });

    client
        .start()
        .await
        .context("Failed to start chat session")?;

    if let Some(welcome) = client.welcome_text() {
        println!("{}", welcome);
    }
    let backlog = client.timeline();
    if !backlog.is_empty() {
        println!("{:-<60}", "");
        for msg in &backlog {
            print_message(msg);
        }
        println!("{:-<60}", "");
    }
    println!("Connected. Type a message and press Enter; Ctrl+C to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if let Err(e) = client.send_message(text, &[]).await {
                    eprintln!("Send failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    println!("Shutting down...");
    client.stop().await;
    Ok(())
}

pub async fn send(config: &Config, message: &str) -> Result<()> {
    let client = start(config).await?;
    let sent = client.send_message(message, &[]).await;
    client.stop().await;
    sent.context("Failed to send message")?;
    println!("Message sent.");
    Ok(())
}

pub async fn history(config: &Config, limit: usize, cursor: Option<&str>) -> Result<()> {
    let client = start(config).await?;
    let page = client.fetch_history(limit, cursor).await;
    client.stop().await;
    let msgs = page.context("Failed to fetch history")?;

    if msgs.is_empty() {
        println!("(no messages)");
        return Ok(());
    }
    for msg in &msgs {
        print_message(msg);
    }
    Ok(())
}

/// MIME type from the file extension; unknown extensions upload as binary.
fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

pub async fn upload(
    config: &Config,
    path: &Path,
    mime: Option<&str>,
    caption: Option<&str>,
) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?
        .to_string();
    let mime = mime.unwrap_or_else(|| guess_mime(path));

    let client = start(config).await?;
    let outcome = async {
        let attachment = client.upload_attachment(bytes, &name, mime).await?;
        tracing::info!("Uploaded {} to {}", attachment.name, attachment.url);
        client
            .send_message(caption.unwrap_or(""), std::slice::from_ref(&attachment))
            .await
    }
    .await;
    client.stop().await;
    outcome.context("Failed to upload attachment")?;

    println!("Sent {}.", name);
    Ok(())
}

pub fn show_identity(config: &Config) -> Result<()> {
    let options = config.session_options()?;
    let store = identity_store()?;
    match store.resolve(&options.endpoint, &options.credential, &options.display_name) {
        Some(identity) => println!("{}", identity),
        None => println!("(no stored identity for {})", options.display_name),
    }
    Ok(())
}

pub fn forget(config: &Config) -> Result<()> {
    let client = build_client(config)?;
    client.clear_identity();
    println!("Stored identity cleared.");
    Ok(())
}
