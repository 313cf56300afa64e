//! Table-driven tests for configuration loading and validation.

use dashsync::config::{load_config_from_str, SyncMode};

struct ConfigTestCase {
    name: &'static str,
    yaml: &'static str,
    should_succeed: bool,
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "simple_sync_only",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
  api_key: key
simple_sync:
  sync_path: /tmp/dashboards
"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "webhook_full",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
  api_key_env_var: GRAFANA_API_KEY
git:
  url: git@gitlab.example.com:ops/dashboards.git
  clone_path: /tmp/dashboards
  commits_author:
    name: Bot
    email: bot@example.com
pusher:
  sync_mode: webhook
  delete_removed: true
  config:
    interface: 0.0.0.0
    port: 8080
    path: /gitlab-webhook
    secret_file: /run/secrets/webhook
"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "missing_repository",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
"#,
        should_succeed: false,
        expected_error: Some("either git or simple_sync"),
    },
    ConfigTestCase {
        name: "missing_base_url",
        yaml: r#"
grafana:
  api_key: key
simple_sync:
  sync_path: /tmp/dashboards
"#,
        should_succeed: false,
        expected_error: Some("base_url"),
    },
    ConfigTestCase {
        name: "webhook_without_secret",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
simple_sync:
  sync_path: /tmp/dashboards
pusher:
  sync_mode: webhook
  config:
    interface: 127.0.0.1
    port: 8080
    path: /hook
"#,
        should_succeed: false,
        expected_error: Some("webhook mode requires"),
    },
    ConfigTestCase {
        name: "git_pull_without_interval",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
simple_sync:
  sync_path: /tmp/dashboards
pusher:
  sync_mode: git-pull
"#,
        should_succeed: false,
        expected_error: Some("interval > 0"),
    },
    ConfigTestCase {
        name: "unknown_sync_mode",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
simple_sync:
  sync_path: /tmp/dashboards
pusher:
  sync_mode: carrier-pigeon
"#,
        should_succeed: false,
        expected_error: Some("carrier-pigeon"),
    },
    ConfigTestCase {
        name: "unknown_field",
        yaml: r#"
grafana:
  base_url: http://localhost:3000
  colour: blue
simple_sync:
  sync_path: /tmp/dashboards
"#,
        should_succeed: false,
        expected_error: Some("colour"),
    },
];

#[test]
fn config_table() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.yaml);
        match (case.should_succeed, result) {
            (true, Ok(_)) => {}
            (true, Err(e)) => panic!("[{}] expected success, got: {}", case.name, e),
            (false, Ok(_)) => panic!("[{}] expected failure, got success", case.name),
            (false, Err(e)) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.to_string().contains(expected),
                        "[{}] error '{}' does not mention '{}'",
                        case.name,
                        e,
                        expected
                    );
                }
            }
        }
    }
}

#[test]
fn webhook_settings_survive_loading() {
    let config = load_config_from_str(CONFIG_TESTS[1].yaml).unwrap();
    let pusher = config.pusher.unwrap();

    assert_eq!(pusher.sync_mode, SyncMode::Webhook);
    assert!(pusher.delete_removed);
    assert_eq!(pusher.config.listen_address(), "0.0.0.0:8080");
    assert_eq!(config.git.unwrap().branch, "master");
}
