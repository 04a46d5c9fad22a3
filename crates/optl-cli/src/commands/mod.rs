//! Command handler modules for optl-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod reconcile;

use anyhow::Result;
use optl_config::{
    load_layered_yaml, report_unused_keys, ConfigMode, LoadedConfig, PollerConfig,
    UnusedKeyPolicy,
};
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config for the CLI and build its typed view.
///
/// Unused keys are reported on stderr but never fail the load.
pub fn load_cli_config(paths: &[String]) -> Result<(LoadedConfig, PollerConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(ConfigMode::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has unused keys");
    }

    let cfg = PollerConfig::from_config_json(&loaded.config_json)?;
    Ok((loaded, cfg))
}
