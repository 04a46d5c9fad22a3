//! Shared runtime state for optl-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Each reconciliation
//! session is owned by exactly one entry in `sessions`; removing the entry
//! drops its [`ReconcileHandle`], which cancels both of its timers.
//!
//! A resolved session stays readable for `retain_terminal` and is then
//! evicted, so views that vanish without a DELETE do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use optl_account::{AccountStateReader, AccountVariant};
use optl_config::{poller, PollerConfig};
use optl_poller::{spawn_reconciliation, Baseline, ReconcileHandle};
use optl_reconcile::{AccountSnapshot, ReconcileTiming, SessionView, SuccessCriterion};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Account reader shared by every session the daemon runs.
pub type DynReader = Arc<dyn AccountStateReader<State = AccountSnapshot>>;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    Session {
        session_id: Uuid,
        view: SessionView<AccountSnapshot>,
    },
    SessionEvicted {
        session_id: Uuid,
    },
}

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-daemon reconciliation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaemonSettings {
    pub timing: ReconcileTiming,
    /// Criterion used when a start request does not name one.
    pub default_criterion: SuccessCriterion,
    /// Where `go_to_dashboard` sends the view.
    pub dashboard_path: String,
    /// Time a resolved session is kept before eviction.
    pub retain_terminal: Duration,
    pub max_sessions: usize,
}

impl DaemonSettings {
    pub fn from_config(cfg: &PollerConfig) -> Result<Self> {
        let default_criterion = match AccountVariant::parse(&cfg.account.variant)? {
            AccountVariant::Credits => SuccessCriterion::CreditsIncreased,
            AccountVariant::Subscription => SuccessCriterion::SubscriptionActive {
                target_plan: cfg.target_plan().map(str::to_string),
            },
        };
        Ok(Self {
            timing: cfg.timing(),
            default_criterion,
            dashboard_path: cfg.daemon.dashboard_path.clone(),
            retain_terminal: cfg.retain_terminal(),
            max_sessions: cfg.daemon.max_sessions,
        })
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            timing: ReconcileTiming::default(),
            default_criterion: SuccessCriterion::CreditsIncreased,
            dashboard_path: poller::DEFAULT_DASHBOARD_PATH.to_string(),
            retain_terminal: Duration::from_millis(poller::DEFAULT_RETAIN_TERMINAL_MS),
            max_sessions: poller::DEFAULT_MAX_SESSIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// One live (or resolved, not yet discarded) reconciliation.
pub struct SessionEntry {
    pub criterion: SuccessCriterion,
    pub handle: ReconcileHandle<AccountSnapshot>,
}

pub type SessionMap = Arc<RwLock<HashMap<Uuid, SessionEntry>>>;

/// `start_session` refused: the daemon already holds `limit` sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtCapacity {
    pub limit: usize,
}

impl std::fmt::Display for AtCapacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session limit reached ({})", self.limit)
    }
}

impl std::error::Error for AtCapacity {}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared across all Axum handlers behind an `Arc`.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    pub settings: DaemonSettings,
    pub reader: DynReader,
    pub sessions: SessionMap,
}

impl AppState {
    pub fn new(reader: DynReader, settings: DaemonSettings) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "optl-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            settings,
            reader,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a session and register it. Must be called inside a tokio runtime.
    ///
    /// Refused once `max_sessions` entries are held.
    pub async fn start_session(
        &self,
        criterion: SuccessCriterion,
        baseline: Option<AccountSnapshot>,
    ) -> Result<(Uuid, SessionView<AccountSnapshot>), AtCapacity> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.settings.max_sessions {
            warn!(limit = self.settings.max_sessions, "reconcile/start refused: at capacity");
            return Err(AtCapacity {
                limit: self.settings.max_sessions,
            });
        }

        let session_id = Uuid::new_v4();
        let baseline = match baseline {
            Some(value) => Baseline::Known(value),
            None => Baseline::FetchFirst,
        };

        let handle = spawn_reconciliation(
            Arc::clone(&self.reader),
            criterion.clone(),
            baseline,
            self.settings.timing,
        );
        // Spawned under the write guard: eviction cannot run before the insert.
        forward_updates(
            session_id,
            &handle,
            self.bus.clone(),
            Arc::clone(&self.sessions),
            self.settings.retain_terminal,
        );

        let view = handle.view();
        sessions.insert(session_id, SessionEntry { criterion, handle });

        info!(%session_id, "reconcile/start");
        Ok((session_id, view))
    }

    pub async fn session_view(&self, session_id: Uuid) -> Option<SessionView<AccountSnapshot>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|e| e.handle.view())
    }

    /// Remove a session, cancelling its timers. Returns the removed entry.
    pub async fn discard_session(&self, session_id: Uuid) -> Option<SessionEntry> {
        let entry = self.sessions.write().await.remove(&session_id)?;
        entry.handle.cancel();
        info!(%session_id, status = %entry.handle.status(), "reconcile/discard");
        Some(entry)
    }
}

/// Relay every session update onto the SSE bus, then evict the session
/// `retain` after it resolves.
///
/// The watch channel closes when the driver task exits. A session that closes
/// while still polling was cancelled, and its entry is already gone.
fn forward_updates(
    session_id: Uuid,
    handle: &ReconcileHandle<AccountSnapshot>,
    bus: broadcast::Sender<BusMsg>,
    sessions: SessionMap,
    retain: Duration,
) {
    let mut rx = handle.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            let _ = bus.send(BusMsg::Session { session_id, view });
        }

        let status = rx.borrow().status;
        if !status.is_terminal() {
            return;
        }

        tokio::time::sleep(retain).await;
        if sessions.write().await.remove(&session_id).is_some() {
            info!(%session_id, %status, "reconcile/evict");
            let _ = bus.send(BusMsg::SessionEvicted { session_id });
        }
    });
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

static STARTED: OnceLock<Instant> = OnceLock::new();

/// Record the process start instant. Only the first call records; `main`
/// makes it before serving.
pub fn mark_started() -> Instant {
    *STARTED.get_or_init(Instant::now)
}

/// Seconds since [`mark_started`].
pub fn uptime_secs() -> u64 {
    mark_started().elapsed().as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
