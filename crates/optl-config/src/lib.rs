//! optl-config
//!
//! Layered YAML configuration for the reconciliation poller.
//!
//! Documents are merged in order (earlier = base, later = override),
//! converted to JSON, checked for secret literals and hashed over their
//! canonical form. Typed views over the merged document live in
//! [`poller`]; env-named secrets are resolved in [`secrets`].

pub mod poller;
pub mod secrets;

pub use poller::PollerConfig;
pub use secrets::{resolve_secrets, resolve_secrets_with, ResolvedSecrets};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, loading aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "rk_live",    // Stripe restricted
    "whsec_",     // Stripe webhook signing secret
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "eyJ",        // JWT (session / bearer tokens)
];

/// Which binary is consuming the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Cli,
    Daemon,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMode::Cli => "CLI",
            ConfigMode::Daemon => "DAEMON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub mode: String,
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Registry of consumed JSON-pointer prefixes per mode.
///
/// Must reflect what the code actually reads; see `PollerConfig::from_config_json`
/// and `secrets::resolve_secrets_with`.
pub fn consumed_pointers_for_mode(mode: ConfigMode) -> &'static [&'static str] {
    match mode {
        ConfigMode::Cli => &[
            "/account/base_url",
            "/account/variant",
            "/account/token_env",
            "/account/require_token",
            "/account/request_timeout_ms",
            "/poll/interval_ms",
            "/poll/deadline_ms",
            "/target/plan",
        ],
        ConfigMode::Daemon => &[
            "/account/base_url",
            "/account/variant",
            "/account/token_env",
            "/account/require_token",
            "/account/request_timeout_ms",
            "/poll/interval_ms",
            "/poll/deadline_ms",
            "/target/plan",
            "/daemon/addr",
            "/daemon/dashboard_path",
            "/daemon/retain_terminal_ms",
            "/daemon/max_sessions",
        ],
    }
}

/// Produce an unused-key report for a given mode.
/// If `policy == Fail`, returns an error when unused keys exist.
/// If `policy == Warn`, always returns Ok(report).
pub fn report_unused_keys(
    mode: ConfigMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<Vec<&str>> = consumed_pointers_for_mode(mode)
        .iter()
        .map(|p| segments(p))
        .collect();

    let unused: BTreeSet<String> = leaf_values(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| {
            let leaf = segments(ptr);
            !consumed.iter().any(|prefix| leaf.starts_with(prefix))
        })
        .collect();

    let report = UnusedKeyReport {
        mode: mode.as_str().to_string(),
        consumed_prefixes: consumed.iter().map(|segs| join_pointer(segs)).collect(),
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let first: Vec<&String> = report.unused_leaf_pointers.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS (mode={}): {} unused config leaf key(s) detected. \
            Remove them or update the consumed registry. First few: {:?}",
            report.mode,
            report.unused_leaf_pointers.len(),
            first
        );
    }

    Ok(report)
}

/// Split a JSON pointer into its (still escaped) reference tokens.
/// Leading, trailing and doubled slashes are ignored, so "poll/" and
/// "/poll" name the same node and "" names the root.
fn segments(pointer: &str) -> Vec<&str> {
    pointer.trim().split('/').filter(|t| !t.is_empty()).collect()
}

fn join_pointer(segs: &[&str]) -> String {
    format!("/{}", segs.join("/"))
}

/// Every scalar in `root` with its JSON pointer. Empty objects and arrays
/// hold no leaves; a scalar root is reported as "/".
fn leaf_values(root: &Value) -> Vec<(String, &Value)> {
    let mut leaves = Vec::new();
    let mut pending = vec![(String::new(), root)];

    while let Some((ptr, node)) = pending.pop() {
        match node {
            Value::Object(map) => pending.extend(map.iter().map(|(k, v)| {
                let token = k.replace('~', "~0").replace('/', "~1");
                (format!("{ptr}/{token}"), v)
            })),
            Value::Array(items) => pending.extend(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (format!("{ptr}/{i}"), v)),
            ),
            scalar if ptr.is_empty() => leaves.push(("/".to_string(), scalar)),
            scalar => leaves.push((ptr, scalar)),
        }
    }

    leaves
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merge_into(&mut merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json::Map is a BTreeMap without `preserve_order`, so keys serialize sorted.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Overlay `layer` onto `base`. Objects merge key by key; anything else in
/// `layer` (including arrays and null) replaces what `base` held.
fn merge_into(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                merge_into(dst.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let hit = leaf_values(v)
        .into_iter()
        .find(|(_, leaf)| leaf.as_str().is_some_and(looks_like_secret));
    match hit {
        Some((ptr, _)) => bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED"),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
