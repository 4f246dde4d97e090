//! massmail - command-line frontend for a bulk-email dispatch backend
//!
//! Signs in against the backend API, manages templates and uploaded
//! recipient CSVs, dispatches mass mail with `{{field}}` placeholder
//! substitution, and pages through the dispatch log.

mod commands;
mod session_file;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use massmail_core::{ClientConfig, SessionStore};
use massmail_http::client::ClientBuilder;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::{App, Command};
use crate::session_file::SessionFile;

#[derive(Parser, Debug)]
#[command(
    name = "massmail",
    version,
    about = "Bulk-email dispatch from CSV recipient lists"
)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Override the backend base URL
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "massmail_cli=info,massmail_http=info,massmail_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            ClientConfig::from_file(path)?
        }
        None => ClientConfig::from_env()?,
    };
    let config = match cli.server {
        Some(server) => config.with_server_url(server),
        None => config,
    };

    let session = SessionFile::open()?;
    let store = Arc::new(SessionStore::new());

    // Refresh failure means the session is gone: clear state and point
    // back at login. Silent when there was no session to begin with —
    // the "already on the login screen" case.
    let hook_store = Arc::clone(&store);
    let session_path = session.path().to_path_buf();
    let had_session = session.token().is_some();
    let mut builder = ClientBuilder::new()
        .base_url(config.server_url.clone())
        .on_session_expired(move || {
            hook_store.clear();
            let _ = std::fs::remove_file(&session_path);
            if had_session {
                eprintln!("Session expired. Run `massmail login` to sign in again.");
            }
        });
    if let Some(token) = session.token() {
        builder = builder.access_token(token);
    }
    let client = builder.build_authenticated()?;

    let mut app = App {
        config,
        store,
        client,
        session,
    };

    let result = commands::dispatch(&mut app, cli.command).await;

    // Persist a token rotated by a mid-command refresh
    if result.is_ok() {
        if let Some(token) = app.client.access_token() {
            if app.session.token() != Some(token.as_str()) {
                app.session.remember(&token)?;
            }
        }
    }

    result
}
