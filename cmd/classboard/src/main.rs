//! # classboard
//!
//! Loads settings, wires the SQLite store and auth adapters into the
//! services, and serves the HTTP API until ctrl-c.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState};
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use configs::{LoggingSettings, Settings};
use secrecy::ExposeSecret;
use services::{Ports, Services};
use storage_adapters::{InMemoryLoginThrottle, SqliteStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", logging.level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.logging);

    let store = Arc::new(
        SqliteStore::connect(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("opening database")?,
    );

    let auth = &settings.auth;
    let ports = Ports {
        users: store.clone(),
        questions: store.clone(),
        answers: store.clone(),
        reviews: store.clone(),
        votes: store.clone(),
        trust: store.clone(),
        chats: store,
        hasher: Arc::new(Argon2PasswordHasher::new()),
        tokens: Arc::new(JwtTokenService::new(
            &auth.jwt_secret,
            chrono::Duration::seconds(auth.token_ttl_secs),
        )),
        throttle: Arc::new(InMemoryLoginThrottle::new(
            auth.max_login_attempts,
            auth.lockout_window(),
        )),
    };

    let state = AppState::new(Services::new(ports));
    let app = router(state, &settings.server.cors_origins);

    let addr = settings.server.addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "classboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
