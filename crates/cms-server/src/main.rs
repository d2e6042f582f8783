//! HTTP server for the cms document service.
//!
//! Serves one flat directory of `.txt` and `.md` documents. Reading is open
//! to everyone; every mutation requires a signed-in session.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cms_core::{validate_signup, CmsService, CredentialBackend, PasswordHasher};
use cms_storage_local::{Argon2Hasher, FileCredentialStore, LocalDocumentStore};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod router;
mod session;

use config::{Command, Config};
use handlers::AppState;
use router::build_router;
use session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());

    match config.command.clone() {
        Some(Command::AddUser { username, password }) => {
            add_user(
                &config.effective_credentials_file(),
                hasher,
                &username,
                &password,
            )
            .await
        }
        Some(Command::Serve) | None => serve(config, hasher).await,
    }
}

/// Register one user in the credentials file.
async fn add_user(
    path: &Path,
    hasher: Arc<dyn PasswordHasher>,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    let store = FileCredentialStore::create_or_load(path, hasher)?;
    let existing = store.usernames().await?;
    validate_signup(username, password, &existing)?;
    store.add(username, password).await?;

    info!("Added user {} to {}", username, store.path().display());
    Ok(())
}

async fn serve(config: Config, hasher: Arc<dyn PasswordHasher>) -> anyhow::Result<()> {
    let data_dir = config.effective_data_dir();
    let credentials_file = config.effective_credentials_file();

    info!("Starting cms-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Data dir: {}", data_dir.display());
    info!("  Credentials: {}", credentials_file.display());

    let credentials = FileCredentialStore::load(&credentials_file, hasher).with_context(|| {
        format!(
            "Provision {} first, e.g. with `cms-server add-user`",
            credentials_file.display()
        )
    })?;
    let documents = LocalDocumentStore::new(&data_dir);

    let state = AppState {
        cms: CmsService::new(Arc::new(documents), Arc::new(credentials)),
        sessions: Arc::new(SessionStore::new()),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Received SIGTERM, initiating shutdown");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
