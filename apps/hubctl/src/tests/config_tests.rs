use super::*;

use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings(&dir.path().join("hubctl.toml")).expect("settings");
    assert_eq!(settings.page_size, Settings::default().page_size);
    assert_eq!(settings.reason_policy, ReasonPolicy::Drop);
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hubctl.toml");
    fs::write(
        &path,
        r#"
endpoint = "http://127.0.0.1:4566"
page_size = 25
reason_policy = "reject"
"#,
    )
    .expect("write config");

    let mut settings = Settings::default();
    apply_file(&mut settings, &fs::read_to_string(&path).expect("read")).expect("apply");
    assert_eq!(settings.endpoint, "http://127.0.0.1:4566");
    assert_eq!(settings.page_size, 25);
    assert_eq!(settings.reason_policy, ReasonPolicy::Reject);
    assert_eq!(settings.request_timeout_secs, 30);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hubctl.toml");
    fs::write(&path, "unknown_key = true\n").expect("write config");

    let err = load_settings(&path).expect_err("should fail");
    assert!(err.to_string().contains("invalid config file"));
}

#[test]
fn app_prefixed_env_wins_over_tool_prefix() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env(&[
            ("HUBCTL_ENDPOINT", "http://first"),
            ("APP__ENDPOINT", "http://second"),
            ("HUBCTL_STATE_DB", "./state.db"),
            ("APP__REASON_POLICY", "Reject"),
            ("APP__REQUEST_TIMEOUT_SECS", "5"),
        ]),
    )
    .expect("env");

    assert_eq!(settings.endpoint, "http://second");
    assert_eq!(settings.state_database_url, "./state.db");
    assert_eq!(settings.reason_policy, ReasonPolicy::Reject);
    assert_eq!(settings.request_timeout_secs, 5);
}

#[test]
fn invalid_env_values_are_rejected() {
    let mut settings = Settings::default();
    assert!(apply_env(&mut settings, env(&[("APP__PAGE_SIZE", "lots")])).is_err());
    assert!(apply_env(&mut settings, env(&[("APP__REASON_POLICY", "ignore")])).is_err());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/state.db"),
        "sqlite://./data/state.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().state_database_url
    );
}
