//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (e.g. `"OPTL_API_TOKEN"`).
//! - Binaries call [`resolve_secrets`] once at startup and pass the result
//!   into constructors; no other code reads the environment for secrets.
//! - `Debug` redacts values. Errors name the variable, never the value.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::poller::DEFAULT_TOKEN_ENV;

/// Secrets resolved from the environment. Values are redacted in `Debug`.
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Env var the token was read from.
    pub api_token_env: String,
    /// Bearer token for the account-state endpoint. `None` if unset or blank.
    pub api_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("api_token_env", &self.api_token_env)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(config_json: &Value) -> Result<ResolvedSecrets> {
    resolve_secrets_with(config_json, |name| std::env::var(name).ok())
}

/// Resolve secrets through `lookup` (env var name -> value).
///
/// Fails only when `/account/require_token` is true and the named variable
/// is missing or blank.
pub fn resolve_secrets_with<F>(config_json: &Value, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let env_name = read_str_at(config_json, "/account/token_env")
        .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());
    let required = config_json
        .pointer("/account/require_token")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let api_token = lookup(&env_name).filter(|v| !v.trim().is_empty());
    if required && api_token.is_none() {
        bail!(
            "SECRET_MISSING: env var {} is required by /account/require_token but is unset or empty",
            env_name
        );
    }

    Ok(ResolvedSecrets {
        api_token_env: env_name,
        api_token,
    })
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
