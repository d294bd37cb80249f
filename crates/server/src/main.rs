use std::net::SocketAddr;

use anyhow::Context;
use axum::{http::StatusCode, Router};
use clap::{Parser, Subcommand};
use shared::error::ErrorCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod overlay_api;
mod pages;
mod push;
mod quiz_api;

use config::{load_settings, Settings};

#[derive(Debug, Parser)]
#[command(name = "server", about = "Live overlay and quiz board server")]
struct Cli {
    /// Address to listen on; overrides server.toml and the environment.
    #[arg(long, global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    app: AppKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum AppKind {
    /// Marquee and transition overlays for the livestream.
    Overlay,
    /// Two-team quiz with moderator, board, answer panels and scoreboard.
    Quiz,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(bind) = cli.bind {
        settings.server_bind = bind;
    }

    let app = build_app(cli.app, &settings).await?;

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, app = ?cli.app, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_app(kind: AppKind, settings: &Settings) -> anyhow::Result<Router> {
    Ok(match kind {
        AppKind::Overlay => overlay_api::build_router(app_state::overlay_state()),
        AppKind::Quiz => quiz_api::build_router(app_state::quiz_state(settings).await?),
    })
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Precondition => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/ws_tests.rs"]
mod ws_tests;
