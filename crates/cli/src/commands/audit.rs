use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use titledesk_analysis::GeminiClient;
use titledesk_core::config::{AppConfig, LoadOptions};
use titledesk_tools::audit::{AuditWorkflowError, ClosingAuditSession};
use titledesk_tools::export::{FileExporter, ReportExporter};
use titledesk_tools::staging::stage_paths;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum StepStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct AuditStep {
    name: &'static str,
    status: StepStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct AuditRunReport {
    command: &'static str,
    status: StepStatus,
    summary: String,
    total_elapsed_ms: u64,
    report_path: Option<String>,
    steps: Vec<AuditStep>,
}

/// Offline rendition of the audit workflow: stage local files, submit them
/// once, export the narrative as a timestamped text report.
pub fn run(
    contracts: &[PathBuf],
    disclosure: Option<&Path>,
    export_dir: Option<PathBuf>,
) -> CommandResult {
    let started = Instant::now();
    let mut steps = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("audit", "config_validation", error.to_string(), 2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "audit",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                5,
            );
        }
    };

    let stage_started = Instant::now();
    let mut session = ClosingAuditSession::new();
    let staged = runtime.block_on(async {
        let contract_files = stage_paths(contracts).await?;
        let disclosure_file = match disclosure {
            Some(path) => stage_paths([path]).await?.into_iter().next(),
            None => None,
        };
        Ok::<_, titledesk_tools::staging::StagingError>((contract_files, disclosure_file))
    });

    match staged {
        Ok((contract_files, disclosure_file)) => {
            let count = contract_files.len() + usize::from(disclosure_file.is_some());
            if let Err(error) = session.add_contracts(contract_files) {
                return CommandResult::failure("audit", "staging", error.to_string(), 3);
            }
            if let Some(file) = disclosure_file {
                if let Err(error) = session.set_disclosure(file) {
                    return CommandResult::failure("audit", "staging", error.to_string(), 3);
                }
            }
            steps.push(AuditStep {
                name: "stage_documents",
                status: StepStatus::Pass,
                elapsed_ms: stage_started.elapsed().as_millis() as u64,
                message: format!("{count} file(s) staged"),
            });
        }
        Err(error) => {
            steps.push(AuditStep {
                name: "stage_documents",
                status: StepStatus::Fail,
                elapsed_ms: stage_started.elapsed().as_millis() as u64,
                message: error.to_string(),
            });
            steps.push(skipped("analysis_call"));
            steps.push(skipped("report_export"));
            return finalize(steps, None, started.elapsed().as_millis() as u64);
        }
    }

    let client = match GeminiClient::new(&config.analysis) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("audit", "analysis", error.to_string(), 5);
        }
    };

    let analysis_started = Instant::now();
    let outcome =
        runtime.block_on(session.run(&client, config.analysis.audit_temperature)).map(|_| ());
    match outcome {
        Ok(()) => steps.push(AuditStep {
            name: "analysis_call",
            status: StepStatus::Pass,
            elapsed_ms: analysis_started.elapsed().as_millis() as u64,
            message: "audit narrative received".to_string(),
        }),
        Err(error) => {
            let message = match &error {
                AuditWorkflowError::Validation(missing) => {
                    format!("{} (missing: {})", error.visitor_message(), missing.join(", "))
                }
                _ => error.visitor_message(),
            };
            steps.push(AuditStep {
                name: "analysis_call",
                status: StepStatus::Fail,
                elapsed_ms: analysis_started.elapsed().as_millis() as u64,
                message,
            });
            steps.push(skipped("report_export"));
            return finalize(steps, None, started.elapsed().as_millis() as u64);
        }
    }

    let export_started = Instant::now();
    let directory = export_dir.unwrap_or_else(|| config.storage.export_dir.clone());
    let exported = std::fs::create_dir_all(&directory)
        .map_err(|error| format!("could not create `{}`: {error}", directory.display()))
        .and_then(|()| {
            let report = session
                .report()
                .ok_or_else(|| "audit finished without a report narrative".to_string())?;
            FileExporter::new(&directory).export(&report).map_err(|error| error.to_string())
        });

    let report_path = match exported {
        Ok(path) => {
            steps.push(AuditStep {
                name: "report_export",
                status: StepStatus::Pass,
                elapsed_ms: export_started.elapsed().as_millis() as u64,
                message: format!("report saved to `{}`", path.display()),
            });
            Some(path.display().to_string())
        }
        Err(message) => {
            steps.push(AuditStep {
                name: "report_export",
                status: StepStatus::Fail,
                elapsed_ms: export_started.elapsed().as_millis() as u64,
                message,
            });
            None
        }
    };

    finalize(steps, report_path, started.elapsed().as_millis() as u64)
}

fn skipped(name: &'static str) -> AuditStep {
    AuditStep {
        name,
        status: StepStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize(steps: Vec<AuditStep>, report_path: Option<String>, total_elapsed_ms: u64) -> CommandResult {
    let passed = steps.iter().filter(|step| step.status == StepStatus::Pass).count();
    let total = steps.len();
    let failed = steps.iter().any(|step| step.status == StepStatus::Fail);

    let report = AuditRunReport {
        command: "audit",
        status: if failed { StepStatus::Fail } else { StepStatus::Pass },
        summary: format!("audit: {passed}/{total} steps passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        report_path,
        steps,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"audit\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
