// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the `formguard` server.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use backend_lib::{
    auth::{hash_password_secure, Argon2Encoder},
    config::Settings,
    router, AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often dead sessions are swept from memory
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Form-login server with persistent remember-me tokens
#[derive(Parser, Debug)]
#[command(name = "formguard")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Config file (defaults to config/default.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override `server.bind_addr`
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Print an Argon2id hash for the `users` config section
    HashPassword {
        /// Plaintext password
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Serve { config, bind } => serve(config, bind).await,
        Command::HashPassword { mut password } => {
            let hash = hash_password_secure(&Argon2Encoder::default(), &mut password)?;
            println!("{hash}");
            Ok(())
        },
    }
}

fn init_tracing(log_level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config: Option<PathBuf>, bind: Option<SocketAddr>) -> Result<()> {
    let mut settings = match &config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Settings::load().context("loading config")?,
    };
    if let Some(bind) = bind {
        settings.server.bind_addr = bind;
    }

    init_tracing(&settings.server.log_level);

    let addr = settings.server.bind_addr;
    let sweep_interval = settings.remember_me.sweep_interval();
    let state = Arc::new(AppState::new(settings).await?);

    let sweep = state.tokens.clone().spawn_expiry_sweep(sweep_interval);
    let cleanup = state.sessions.spawn_cleanup(SESSION_CLEANUP_INTERVAL);

    let app = router::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    cleanup.abort();
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
