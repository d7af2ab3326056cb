use serde::Serialize;
use titledesk_core::config::{AppConfig, LoadOptions};
use titledesk_core::session::{FileStore, KeyValueStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_analysis_key(&config));
            checks.push(check_session_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "analysis_key_readiness",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "session_store_writability",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_analysis_key(config: &AppConfig) -> DoctorCheck {
    if config.analysis_ready() {
        DoctorCheck {
            name: "analysis_key_readiness",
            status: CheckStatus::Pass,
            details: format!("API key present; model `{}` configured", config.analysis.model),
        }
    } else {
        DoctorCheck {
            name: "analysis_key_readiness",
            status: CheckStatus::Fail,
            details: "analysis API key is not configured; audit and smart lookup unavailable"
                .to_string(),
        }
    }
}

fn check_session_store(config: &AppConfig) -> DoctorCheck {
    let store = FileStore::new(&config.storage.session_path);

    let result = store
        .set("doctor_probe", "ok")
        .and_then(|()| store.get("doctor_probe"))
        .and_then(|_| store.remove("doctor_probe"));

    match result {
        Ok(()) => DoctorCheck {
            name: "session_store_writability",
            status: CheckStatus::Pass,
            details: format!("probe written to `{}`", config.storage.session_path.display()),
        },
        Err(error) => DoctorCheck {
            name: "session_store_writability",
            status: CheckStatus::Fail,
            details: format!("session store probe failed: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
