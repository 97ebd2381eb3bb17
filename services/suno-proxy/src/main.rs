//! Suno Cookie Relay
//!
//! Single-binary Rust service that:
//! 1. Loads a pool of Suno accounts from JSON files on disk
//! 2. Keeps one account's session token fresh via Clerk
//! 3. Relays generation requests to the studio API with that token
//! 4. Rotates to the next account when its credits run out

mod config;
mod error;
mod metrics;
mod relay;
mod upstream;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use suno_auth::AccountStore;
use suno_pool::{Pool, spawn_refresh_task};

use crate::config::Config;
use crate::error::Error;
use crate::metrics::RuntimeCounters;
use crate::upstream::{CreditsSummary, StudioClient};

/// How long to wait for in-flight requests to drain on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    pool: Arc<Pool>,
    studio: StudioClient,
    counters: RuntimeCounters,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// The relay API routes sit behind the request-tracking middleware;
/// `/health` and `/metrics` are registered after it so probes do not
/// skew the request counters. The concurrency limit layer covers
/// everything, enforcing the configured max concurrent request limit.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/generate", post(generate_handler))
        .route("/generate/description-mode", post(generate_description_handler))
        .route("/generate/lyrics", post(generate_lyrics_handler))
        .route("/lyrics/{lyrics_id}", get(lyrics_handler))
        .route("/feed/{clip_id}", get(feed_handler))
        .route("/get_credits", get(credits_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting suno-cookie-proxy");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.relay.listen_addr,
        studio_url = %config.upstream.studio_url,
        clerk_url = %config.upstream.clerk_url,
        accounts_file = %config.accounts.accounts_file.display(),
        "configuration loaded"
    );

    let store = AccountStore::load(
        config.accounts.accounts_file.clone(),
        config.accounts.disabled_file.clone(),
    )
    .await
    .with_context(|| {
        format!(
            "failed to load accounts from {}",
            config.accounts.accounts_file.display()
        )
    })?;

    let timeout = Duration::from_secs(config.upstream.timeout_secs);
    let pool = Arc::new(Pool::new(
        Arc::new(store),
        reqwest::Client::new(),
        config.upstream.clerk_url.clone(),
        timeout,
    ));

    // Bring the front account online. Failure here is not fatal: the
    // background refresher keeps retrying, and requests recover the
    // session on demand.
    match pool.activate_front().await {
        Ok(()) => {
            if let Some(account) = pool.current_account().await {
                info!(account_id = %account, "session ready");
            }
        }
        Err(suno_pool::Error::NoActiveAccounts) => {
            warn!("no active accounts configured; requests will fail until accounts are added");
        }
        Err(e) => {
            warn!(error = %e, "initial token refresh failed, background refresher will retry");
        }
    }

    let refresh_interval = Duration::from_secs(config.accounts.refresh_interval_secs);
    let _refresher = spawn_refresh_task(pool.clone(), refresh_interval);
    info!(
        interval_secs = refresh_interval.as_secs(),
        "background token refresher started"
    );

    let studio = StudioClient::new(
        reqwest::Client::new(),
        config.upstream.studio_url.clone(),
        timeout,
    );

    let counters = RuntimeCounters::new();

    // Clone in_flight counter for drain observability after shutdown
    let in_flight = counters.in_flight.clone();

    let app_state = AppState {
        pool,
        studio,
        counters,
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.relay.max_connections);

    let listener = TcpListener::bind(config.relay.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.relay.listen_addr))?;

    info!(addr = %config.relay.listen_addr, "accepting requests");

    // Graceful shutdown: on SIGTERM/SIGINT the oneshot tells axum to stop
    // accepting and drain in-flight requests. DRAIN_TIMEOUT bounds the
    // drain, counted from signal receipt rather than server start.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Wait for the OS signal
    shutdown_signal().await;

    // Signal the server to begin draining
    let _ = shutdown_tx.send(());

    // Race the drain against the timeout
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            let remaining = in_flight.load(Ordering::Relaxed);
            warn!(
                remaining,
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Request accounting for the relay API routes.
///
/// Tracks totals and in-flight count for the health endpoint and records
/// per-request Prometheus metrics with status and method labels.
async fn track_requests(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    state.counters.requests_total.fetch_add(1, Ordering::Relaxed);
    state.counters.in_flight.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    state.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        state.counters.errors_total.fetch_add(1, Ordering::Relaxed);
    }
    metrics::record_request(status.as_u16(), &method, started.elapsed().as_secs_f64());

    response
}

/// Liveness envelope matching the upstream web app's root response.
async fn root_handler() -> Json<Value> {
    Json(json!({"code": 0, "msg": "success", "data": null}))
}

/// Start a custom-mode generation job on the active account.
///
/// Plain pass-through: the body is opaque to the relay, and upstream
/// failures propagate without touching the pool.
async fn generate_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> std::result::Result<Json<Value>, Error> {
    let token = require_token(&state).await?;
    let data = state.studio.generate(&token, &body).await?;
    Ok(Json(data))
}

/// Start a description-mode generation job, rotating past drained
/// accounts. This is the quota-gated endpoint.
async fn generate_description_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> std::result::Result<Json<Value>, Error> {
    let data = relay::generate_with_rotation(&state.pool, &state.studio, &body).await?;
    Ok(Json(data))
}

/// Start a lyrics generation job on the active account.
async fn generate_lyrics_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> std::result::Result<Json<Value>, Error> {
    let prompt = body
        .get("prompt")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidRequest("prompt is required".into()))?;
    let token = require_token(&state).await?;
    let data = state
        .studio
        .generate_lyrics(&token, &json!({"prompt": prompt}))
        .await?;
    Ok(Json(data))
}

/// Fetch a lyrics job by ID.
async fn lyrics_handler(
    State(state): State<AppState>,
    Path(lyrics_id): Path<String>,
) -> std::result::Result<Json<Value>, Error> {
    let token = require_token(&state).await?;
    let data = state.studio.lyrics(&token, &lyrics_id).await?;
    Ok(Json(data))
}

/// Fetch a clip's status and audio URLs by ID.
async fn feed_handler(
    State(state): State<AppState>,
    Path(clip_id): Path<String>,
) -> std::result::Result<Json<Value>, Error> {
    let token = require_token(&state).await?;
    let data = state.studio.feed(&token, &clip_id).await?;
    Ok(Json(data))
}

/// Remaining credits for the active account.
async fn credits_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<CreditsSummary>, Error> {
    let token = require_token(&state).await?;
    Ok(Json(state.studio.credits(&token).await?))
}

/// Bearer token for pass-through endpoints, which never rotate.
async fn require_token(state: &AppState) -> std::result::Result<String, Error> {
    state
        .pool
        .bearer_token()
        .await
        .ok_or(Error::TokenUnavailable)
}

/// Health endpoint: pool status plus service counters as JSON.
/// Returns 200 while the pool is healthy (an active account with a usable
/// session token), 503 when degraded or out of accounts.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.counters.started_at.elapsed().as_secs();
    let requests = state.counters.requests_total.load(Ordering::Relaxed);
    let errors = state.counters.errors_total.load(Ordering::Relaxed);

    let mut body = state.pool.health().await;
    if let Some(map) = body.as_object_mut() {
        map.insert("uptime_seconds".into(), uptime.into());
        map.insert("requests_served".into(), requests.into());
        map.insert("errors_total".into(), errors.into());
    }

    let status_code = if body["status"] == "healthy" {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint, rendered in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
