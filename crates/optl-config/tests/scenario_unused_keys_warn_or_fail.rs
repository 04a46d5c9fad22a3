use optl_config::{load_layered_yaml_from_strings, report_unused_keys, ConfigMode, UnusedKeyPolicy};

/// Validates:
/// 1) Unused keys are detected in WARN mode but do not error.
/// 2) Unused keys cause failure in FAIL mode.
/// 3) Keys under consumed prefixes are not flagged.
/// 4) Daemon-only keys are unused for the CLI.

const YAML: &str = r#"
account:
  base_url: "http://127.0.0.1:8000"
  variant: "subscription"
poll:
  interval_ms: 1500
target:
  plan: "pro"
daemon:
  addr: "127.0.0.1:8898"
legacy:
  csv_export_dir: "/tmp/exports"
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();

    let report = report_unused_keys(ConfigMode::Daemon, &loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/legacy/csv_export_dir".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();

    let err = report_unused_keys(ConfigMode::Daemon, &loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"));
    assert!(msg.contains("mode=DAEMON"));
}

#[test]
fn daemon_section_is_unused_for_cli() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();

    let report =
        report_unused_keys(ConfigMode::Cli, &loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/daemon/addr".to_string(),
            "/legacy/csv_export_dir".to_string()
        ]
    );
}

#[test]
fn fully_consumed_config_is_clean() {
    let yaml = r#"
account:
  base_url: "http://127.0.0.1:8000"
poll:
  deadline_ms: 30000
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigMode::Cli, &loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
