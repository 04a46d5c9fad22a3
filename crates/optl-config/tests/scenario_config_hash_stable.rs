//! Config hash stability.
//!
//! GREEN when:
//! - loading the same inputs twice returns identical config_hash.
//! - reordering keys within YAML doesn't change the hash.
//! - different values produce different hashes.
//! - overlays change the hash and the merged values.

use optl_config::{load_layered_yaml, load_layered_yaml_from_strings, PollerConfig};
use std::io::Write;

const BASE_YAML: &str = r#"
account:
  base_url: "https://api.optlisting.example"
  variant: "credits"
  token_env: "OPTL_API_TOKEN"
poll:
  interval_ms: 1500
  deadline_ms: 30000
"#;

const BASE_YAML_REORDERED: &str = r#"
poll:
  deadline_ms: 30000
  interval_ms: 1500
account:
  token_env: "OPTL_API_TOKEN"
  variant: "credits"
  base_url: "https://api.optlisting.example"
"#;

const SUBSCRIPTION_OVERLAY: &str = r#"
account:
  variant: "subscription"
target:
  plan: "pro"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[&BASE_YAML.replace("30000", "45000")]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_variant_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, SUBSCRIPTION_OVERLAY]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);

    let cfg = PollerConfig::from_config_json(&merged.config_json).unwrap();
    assert_eq!(cfg.account.variant, "subscription");
    assert_eq!(cfg.account.base_url, "https://api.optlisting.example");
    assert_eq!(cfg.target_plan(), Some("pro"));
    assert_eq!(cfg.poll.deadline_ms, 30_000);
}

#[test]
fn file_layers_match_string_layers() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(SUBSCRIPTION_OVERLAY.as_bytes()).unwrap();

    let base_path = base.path().to_string_lossy().to_string();
    let overlay_path = overlay.path().to_string_lossy().to_string();

    let from_files = load_layered_yaml(&[base_path.as_str(), overlay_path.as_str()]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, SUBSCRIPTION_OVERLAY]).unwrap();

    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_is_reported_with_path() {
    let err = load_layered_yaml(&["/nonexistent/optl/base.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/optl/base.yaml"));
}
