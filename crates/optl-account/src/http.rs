use std::time::Duration;

use optl_reconcile::{AccountSnapshot, SubscriptionStatus};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::reader::{AccountStateReader, ReadError};
use crate::AccountVariant;

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest slice of an error body carried into a [`ReadError::Http`].
const MAX_ERROR_BODY: usize = 200;

/// reqwest-backed reader for the backend's account-state endpoint.
///
/// The bearer token is passed in by the caller (read from the environment);
/// do not log it.
#[derive(Debug, Clone)]
pub struct HttpAccountClient {
    http: reqwest::Client,
    base_url: String,
    variant: AccountVariant,
    bearer_token: Option<String>,
    request_timeout: Duration,
}

impl HttpAccountClient {
    pub fn new(base_url: impl Into<String>, variant: AccountVariant) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            variant,
            bearer_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.variant.path())
    }

    async fn get_json<B: DeserializeOwned>(&self) -> Result<B, ReadError> {
        let url = self.endpoint_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ReadError::Config(format!(
                "account base_url must be http(s): {}",
                self.base_url
            )));
        }

        let mut req = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReadError::Http {
                status: status.as_u16(),
                message: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ReadError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ReadError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl AccountStateReader for HttpAccountClient {
    type State = AccountSnapshot;

    fn source_name(&self) -> &'static str {
        match self.variant {
            AccountVariant::Subscription => "http:subscription",
            AccountVariant::Credits => "http:credits",
        }
    }

    async fn read_state(&self) -> Result<AccountSnapshot, ReadError> {
        let snap = match self.variant {
            AccountVariant::Subscription => {
                let body: SubscriptionStatusBody = self.get_json().await?;
                AccountSnapshot::Subscription {
                    status: body.subscription_status,
                    plan: body.plan.filter(|p| !p.trim().is_empty()),
                }
            }
            AccountVariant::Credits => {
                let body: CreditsBody = self.get_json().await?;
                AccountSnapshot::Credits {
                    available_credits: body.available_credits,
                }
            }
        };
        debug!(source = self.source_name(), ?snap, "account state read");
        Ok(snap)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionStatusBody {
    subscription_status: SubscriptionStatus,
    #[serde(default)]
    plan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreditsBody {
    available_credits: i64,
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

// -----------------
// Tests (no network)
// -----------------
