//! src/main.rs
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Server;
use lead_agent::{config::Config, create_router, settings::Settings, AppState, GeminiLeads};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. logging + config ────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("model {} via {}", config.model, config.api_base);

    // ── 2. create state ────────────────────────────────────────────────
    let settings = Settings::load(&config.settings_path);
    let source   = Arc::new(GeminiLeads::from_config(&config));
    let state    = Arc::new(AppState::new(source, config.page_size, settings));

    // ── 3. build router & serve ────────────────────────────────────────
    let app  = create_router(state);
    let addr = config
        .address()
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid listen address {}", config.address()))?;

    info!("lead dashboard listening on http://{addr}");
    Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
