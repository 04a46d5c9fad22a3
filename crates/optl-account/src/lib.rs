//! optl-account
//!
//! Account-state read boundary for payment reconciliation.
//!
//! This crate owns the reader abstraction and the HTTP client for the
//! backend's account-state endpoints. It never writes account state; every
//! call is one idempotent read.

mod http;
pub mod reader;

pub use http::HttpAccountClient;
pub use reader::{AccountStateReader, ReadError};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Which account-state endpoint a deployment exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountVariant {
    /// `GET /api/subscription/status` -> `{ subscriptionStatus, plan }`
    Subscription,
    /// `GET /api/credits` -> `{ availableCredits }`
    Credits,
}

impl AccountVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountVariant::Subscription => "subscription",
            AccountVariant::Credits => "credits",
        }
    }

    /// Path of the read endpoint, relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            AccountVariant::Subscription => "/api/subscription/status",
            AccountVariant::Credits => "/api/credits",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscription" | "sub" => Ok(AccountVariant::Subscription),
            "credits" | "credit" => Ok(AccountVariant::Credits),
            other => Err(anyhow!(
                "invalid account variant '{}'. expected one of: subscription | credits",
                other
            )),
        }
    }
}
