//! optl-daemon entry point.
//!
//! Sets up tracing, loads config, builds the shared state, wires middleware
//! and starts the HTTP server. Route handlers live in `routes.rs`; shared
//! state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use optl_account::{AccountVariant, HttpAccountClient};
use optl_config::{
    load_layered_yaml, report_unused_keys, resolve_secrets, ConfigMode, PollerConfig,
    UnusedKeyPolicy,
};
use optl_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Comma-separated list of YAML layers, base first.
const CONFIG_PATHS_ENV: &str = "OPTL_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();
    state::mark_started();

    let config_json = load_config()?;
    let cfg = PollerConfig::from_config_json(&config_json)?;
    let secrets = resolve_secrets(&config_json)?;

    let mut client = HttpAccountClient::new(
        cfg.account.base_url.clone(),
        AccountVariant::parse(&cfg.account.variant)?,
    )
    .with_request_timeout(cfg.request_timeout());
    if let Some(token) = secrets.api_token {
        client = client.with_bearer_token(token);
    } else {
        info!(token_env = %secrets.api_token_env, "no bearer token configured");
    }

    let settings = state::DaemonSettings::from_config(&cfg)?;
    let shared = Arc::new(state::AppState::new(Arc::new(client), settings));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg
            .daemon
            .addr
            .parse()
            .with_context(|| format!("invalid /daemon/addr: {}", cfg.daemon.addr))?,
    };
    info!("optl-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&shared)))
        .await
        .context("server crashed")?;

    Ok(())
}

/// Resolves on Ctrl-C after cancelling every live session.
async fn shutdown_signal(st: Arc<state::AppState>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "ctrl_c listener failed; shutting down");
    }
    let ids: Vec<_> = st.sessions.read().await.keys().copied().collect();
    for id in ids {
        st.discard_session(id).await;
    }
    info!("optl-daemon shutting down");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Merged config JSON. With no layers configured, every key takes its default.
fn load_config() -> anyhow::Result<serde_json::Value> {
    let raw = std::env::var(CONFIG_PATHS_ENV).unwrap_or_default();
    let paths: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paths.is_empty() {
        info!("{CONFIG_PATHS_ENV} unset; using built-in defaults");
        return Ok(serde_json::json!({}));
    }

    let loaded = load_layered_yaml(&paths)?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");

    let report = report_unused_keys(
        ConfigMode::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has unused keys");
    }
    Ok(loaded.config_json)
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("OPTL_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
