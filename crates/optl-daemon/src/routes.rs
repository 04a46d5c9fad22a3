//! Axum router and all HTTP handlers for optl-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)`; the scenario tests in
//! `tests/` compose the router through `build_router`.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use optl_reconcile::{SessionStatus, ViewAction};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    api_types::{
        DashboardResponse, DiscardResponse, ErrorResponse, HealthResponse, RefreshResponse,
        SessionResponse, StartReconcileRequest,
    },
    state::{uptime_secs, AppState, AtCapacity, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/reconcile", post(reconcile_start))
        .route(
            "/v1/reconcile/:id",
            get(reconcile_status).delete(reconcile_discard),
        )
        .route("/v1/reconcile/:id/refresh", post(reconcile_refresh))
        .route("/v1/reconcile/:id/dashboard", get(reconcile_dashboard))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let active_sessions = st.sessions.read().await.len();
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            active_sessions,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/reconcile
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile_start(
    State(st): State<Arc<AppState>>,
    Json(req): Json<StartReconcileRequest>,
) -> Response {
    let criterion = req
        .criterion
        .unwrap_or_else(|| st.settings.default_criterion.clone());

    match st.start_session(criterion, req.baseline).await {
        Ok((session_id, view)) => (
            StatusCode::CREATED,
            Json(SessionResponse { session_id, view }),
        )
            .into_response(),
        Err(full) => at_capacity(full),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/reconcile/:id
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile_status(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    match st.session_view(session_id).await {
        Some(view) => (StatusCode::OK, Json(SessionResponse { session_id, view })).into_response(),
        None => not_found(session_id),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/reconcile/:id/refresh
// ---------------------------------------------------------------------------

/// Only a timed-out session offers `refresh`. The old session is discarded
/// and a fresh one starts with the same criterion and a re-fetched baseline.
pub(crate) async fn reconcile_refresh(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    let (status, criterion) = {
        let sessions = st.sessions.read().await;
        match sessions.get(&session_id) {
            Some(e) => (e.handle.status(), e.criterion.clone()),
            None => return not_found(session_id),
        }
    };

    if !status.actions().contains(&ViewAction::Refresh) {
        return conflict(
            session_id,
            status,
            "REFRESH_UNAVAILABLE: refresh is only offered after a timeout",
        );
    }

    if st.discard_session(session_id).await.is_none() {
        // Discarded concurrently by another request.
        return not_found(session_id);
    }
    let (new_id, view) = match st.start_session(criterion, None).await {
        Ok(started) => started,
        Err(full) => return at_capacity(full),
    };
    info!(replaced = %session_id, session_id = %new_id, "reconcile/refresh");

    (
        StatusCode::CREATED,
        Json(RefreshResponse {
            replaced_session_id: session_id,
            session_id: new_id,
            view,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/reconcile/:id/dashboard
// ---------------------------------------------------------------------------

/// Leaving for the dashboard unmounts the view, so the session is discarded.
pub(crate) async fn reconcile_dashboard(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    let status = match st.session_view(session_id).await {
        Some(view) => view.status,
        None => return not_found(session_id),
    };

    if !status.actions().contains(&ViewAction::GoToDashboard) {
        return conflict(
            session_id,
            status,
            "DASHBOARD_UNAVAILABLE: reconciliation still polling",
        );
    }

    let status = match st.discard_session(session_id).await {
        Some(entry) => entry.handle.status(),
        None => return not_found(session_id),
    };

    (
        StatusCode::OK,
        Json(DashboardResponse {
            session_id,
            status,
            location: st.settings.dashboard_path.clone(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// DELETE /v1/reconcile/:id
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile_discard(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Response {
    match st.discard_session(session_id).await {
        Some(entry) => (
            StatusCode::OK,
            Json(DiscardResponse {
                session_id,
                status: entry.handle.status(),
            }),
        )
            .into_response(),
        None => not_found(session_id),
    }
}

fn not_found(session_id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "SESSION_NOT_FOUND".to_string(),
            session_id: Some(session_id),
            status: None,
        }),
    )
        .into_response()
}

fn conflict(session_id: Uuid, status: SessionStatus, error: &str) -> Response {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: error.to_string(),
            session_id: Some(session_id),
            status: Some(status),
        }),
    )
        .into_response()
}

fn at_capacity(full: AtCapacity) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse {
            error: format!("SESSION_LIMIT: {full}"),
            session_id: None,
            status: None,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Session { .. } => "session",
                    BusMsg::SessionEvicted { .. } => "session_evicted",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
