use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tempfile::TempDir;
use titledesk_cli::commands::{audit, config, doctor, role};

#[test]
fn role_set_then_get_round_trips_through_the_session_file() {
    let dir = TempDir::new().expect("temp dir");
    let session_path = dir.path().join("session.json").display().to_string();

    with_env(&[("TITLEDESK_STORAGE_SESSION_PATH", &session_path)], || {
        let set_result = role::set("seller");
        assert_eq!(set_result.exit_code, 0, "expected successful role set");

        let set_payload = parse_payload(&set_result.output);
        assert_eq!(set_payload["command"], "role");
        assert_eq!(set_payload["status"], "ok");

        let get_result = role::get();
        assert_eq!(get_result.exit_code, 0, "expected successful role get");

        let get_payload = parse_payload(&get_result.output);
        assert_eq!(get_payload["status"], "ok");
        let message = get_payload["message"].as_str().unwrap_or("");
        assert!(message.contains("seller"), "expected remembered role in `{message}`");
    });
}

#[test]
fn role_set_rejects_an_unknown_label() {
    let dir = TempDir::new().expect("temp dir");
    let session_path = dir.path().join("session.json").display().to_string();

    with_env(&[("TITLEDESK_STORAGE_SESSION_PATH", &session_path)], || {
        let result = role::set("plumber");
        assert_eq!(result.exit_code, 3, "expected unknown role failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "role");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "unknown_role");
    });
}

#[test]
fn doctor_flags_a_missing_analysis_key() {
    let dir = TempDir::new().expect("temp dir");
    let session_path = dir.path().join("session.json").display().to_string();

    with_env(&[("TITLEDESK_STORAGE_SESSION_PATH", &session_path)], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("doctor checks array");
        let config_check = find_check(checks, "config_validation");
        assert_eq!(config_check["status"], "pass");

        let key_check = find_check(checks, "analysis_key_readiness");
        assert_eq!(key_check["status"], "fail");
    });
}

#[test]
fn doctor_passes_with_a_key_and_a_writable_store() {
    let dir = TempDir::new().expect("temp dir");
    let session_path = dir.path().join("session.json").display().to_string();

    with_env(
        &[
            ("TITLEDESK_STORAGE_SESSION_PATH", &session_path),
            ("TITLEDESK_ANALYSIS_API_KEY", "test-key"),
        ],
        || {
            let payload = parse_payload(&doctor::run(true));
            assert_eq!(payload["overall_status"], "pass");

            let checks = payload["checks"].as_array().expect("doctor checks array");
            assert_eq!(find_check(checks, "session_store_writability")["status"], "pass");
        },
    );
}

#[test]
fn audit_without_a_disclosure_fails_validation_before_any_network() {
    let dir = TempDir::new().expect("temp dir");
    let session_path = dir.path().join("session.json").display().to_string();
    let contract_path = dir.path().join("contract.txt");
    std::fs::write(&contract_path, b"purchase agreement").expect("writable temp dir");

    with_env(&[("TITLEDESK_STORAGE_SESSION_PATH", &session_path)], || {
        let result =
            audit::run(&[contract_path.clone()], None, Some(dir.path().join("reports")));
        assert_eq!(result.exit_code, 6, "expected audit failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "audit");
        assert_eq!(payload["status"], "fail");

        let steps = payload["steps"].as_array().expect("audit steps array");
        assert_eq!(find_check(steps, "stage_documents")["status"], "pass");

        let analysis_step = find_check(steps, "analysis_call");
        assert_eq!(analysis_step["status"], "fail");
        let message = analysis_step["message"].as_str().unwrap_or("");
        assert!(
            message.contains("Closing Disclosure"),
            "expected validation message, got `{message}`"
        );
        assert_eq!(find_check(steps, "report_export")["status"], "skipped");
    });
}

#[test]
fn config_reports_env_source_and_redacts_the_key() {
    let dir = TempDir::new().expect("temp dir");
    let session_path = dir.path().join("session.json").display().to_string();

    with_env(
        &[
            ("TITLEDESK_STORAGE_SESSION_PATH", &session_path),
            ("TITLEDESK_ANALYSIS_API_KEY", "super-secret-key"),
        ],
        || {
            let output = config::run();
            assert!(!output.contains("super-secret-key"), "key must never be printed");
            assert!(output
                .contains("analysis.api_key = <redacted> (source: env (TITLEDESK_ANALYSIS_API_KEY))"));
            assert!(output.contains("portals.buyer_url"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn find_check<'a>(checks: &'a [Value], name: &str) -> &'a Value {
    checks
        .iter()
        .find(|check| check["name"] == name)
        .unwrap_or_else(|| panic!("missing check `{name}`"))
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TITLEDESK_ANALYSIS_API_KEY",
        "TITLEDESK_ANALYSIS_BASE_URL",
        "TITLEDESK_ANALYSIS_MODEL",
        "TITLEDESK_ANALYSIS_TIMEOUT_SECS",
        "TITLEDESK_ANALYSIS_AUDIT_TEMPERATURE",
        "TITLEDESK_PORTALS_BUYER_URL",
        "TITLEDESK_PORTALS_SELLER_URL",
        "TITLEDESK_INTAKE_ORDERS_EMAIL",
        "TITLEDESK_STORAGE_SESSION_PATH",
        "TITLEDESK_STORAGE_EXPORT_DIR",
        "TITLEDESK_SERVER_BIND_ADDRESS",
        "TITLEDESK_SERVER_PORT",
        "TITLEDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TITLEDESK_LOGGING_LEVEL",
        "TITLEDESK_LOGGING_FORMAT",
        "TITLEDESK_LOG_LEVEL",
        "TITLEDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
