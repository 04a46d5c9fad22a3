//! Typed view of the reconciliation settings.
//!
//! Reads only the pointers listed for the mode in
//! [`consumed_pointers_for_mode`](crate::consumed_pointers_for_mode).
//! Missing keys fall back to the defaults below; present keys are validated.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use optl_reconcile::{ReconcileTiming, MAX_DEADLINE};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TOKEN_ENV: &str = "OPTL_API_TOKEN";
pub const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:8898";
pub const DEFAULT_DASHBOARD_PATH: &str = "/dashboard";
pub const DEFAULT_RETAIN_TERMINAL_MS: u64 = 5 * 60 * 1_000;
pub const DEFAULT_MAX_SESSIONS: usize = 1_024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountSection {
    pub base_url: String,
    /// "subscription" | "credits"
    pub variant: String,
    /// Name of the env var holding the bearer token. Never the token itself.
    pub token_env: String,
    pub require_token: bool,
    pub request_timeout_ms: u64,
}

impl Default for AccountSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            variant: "credits".to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            require_token: false,
            request_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollSection {
    pub interval_ms: u64,
    pub deadline_ms: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        let t = ReconcileTiming::default();
        Self {
            interval_ms: t.poll_interval.as_millis() as u64,
            deadline_ms: t.deadline.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    /// Plan tier a subscription must reach. Ignored by the credits variant.
    pub plan: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub addr: String,
    pub dashboard_path: String,
    /// How long a resolved session stays readable before it is evicted.
    pub retain_terminal_ms: u64,
    /// Sessions held at once; further starts are refused.
    pub max_sessions: usize,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            addr: DEFAULT_DAEMON_ADDR.to_string(),
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
            retain_terminal_ms: DEFAULT_RETAIN_TERMINAL_MS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// Everything the CLI and daemon need to run reconciliations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub account: AccountSection,
    pub poll: PollSection,
    pub target: TargetSection,
    pub daemon: DaemonSection,
}

impl PollerConfig {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let cfg: PollerConfig = serde_json::from_value(config_json.clone())
            .context("config does not match poller schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.base_url.trim().is_empty() {
            bail!("CONFIG_INVALID /account/base_url must not be empty");
        }
        match self.account.variant.trim().to_ascii_lowercase().as_str() {
            "subscription" | "credits" => {}
            other => bail!(
                "CONFIG_INVALID /account/variant='{}'. expected: subscription | credits",
                other
            ),
        }
        if self.account.token_env.trim().is_empty() {
            bail!("CONFIG_INVALID /account/token_env must name an env var");
        }
        if self.poll.interval_ms == 0 {
            bail!("CONFIG_INVALID /poll/interval_ms must be > 0");
        }
        if self.poll.deadline_ms < self.poll.interval_ms {
            bail!(
                "CONFIG_INVALID /poll/deadline_ms ({}) must be >= /poll/interval_ms ({})",
                self.poll.deadline_ms,
                self.poll.interval_ms
            );
        }
        let max_deadline_ms = MAX_DEADLINE.as_millis() as u64;
        if self.poll.deadline_ms > max_deadline_ms {
            bail!(
                "CONFIG_INVALID /poll/deadline_ms ({}) must be <= {}",
                self.poll.deadline_ms,
                max_deadline_ms
            );
        }
        if self.daemon.max_sessions == 0 {
            bail!("CONFIG_INVALID /daemon/max_sessions must be > 0");
        }
        if self.account.request_timeout_ms == 0 {
            bail!("CONFIG_INVALID /account/request_timeout_ms must be > 0");
        }
        Ok(())
    }

    pub fn timing(&self) -> ReconcileTiming {
        ReconcileTiming {
            poll_interval: Duration::from_millis(self.poll.interval_ms),
            deadline: Duration::from_millis(self.poll.deadline_ms),
        }
    }

    pub fn retain_terminal(&self) -> Duration {
        Duration::from_millis(self.daemon.retain_terminal_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.account.request_timeout_ms)
    }

    /// Target plan, trimmed; blank counts as unset.
    pub fn target_plan(&self) -> Option<&str> {
        self.target
            .plan
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}
