//! Request and response types for all optl-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use optl_reconcile::{AccountSnapshot, SessionStatus, SessionView, SuccessCriterion};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

// ---------------------------------------------------------------------------
// /v1/reconcile
// ---------------------------------------------------------------------------

/// Body of `POST /v1/reconcile`. Both fields are optional; an empty object
/// starts a session with the daemon's default criterion and fetches the
/// baseline from the account endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartReconcileRequest {
    pub criterion: Option<SuccessCriterion>,
    /// Account state observed just before payment, if the caller has it.
    pub baseline: Option<AccountSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub view: SessionView<AccountSnapshot>,
}

/// Response for `POST /v1/reconcile/:id/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// The timed-out session that was discarded.
    pub replaced_session_id: Uuid,
    pub session_id: Uuid,
    pub view: SessionView<AccountSnapshot>,
}

/// Response for `GET /v1/reconcile/:id/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub session_id: Uuid,
    /// Terminal status the view left with.
    pub status: SessionStatus,
    pub location: String,
}

/// Response for `DELETE /v1/reconcile/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardResponse {
    pub session_id: Uuid,
    /// Status at the moment of teardown.
    pub status: SessionStatus,
}

// ---------------------------------------------------------------------------
// Errors (404 / 409 / 429)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Absent when the request was refused before a session existed.
    pub session_id: Option<Uuid>,
    /// Present when the session exists but is in the wrong state.
    pub status: Option<SessionStatus>,
}
