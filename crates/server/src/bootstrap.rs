use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;

use titledesk_analysis::GeminiClient;
use titledesk_core::config::{AppConfig, ConfigError, LoadOptions};
use titledesk_core::report::AuditReport;
use titledesk_core::session::{FileStore, RoleStore};
use titledesk_tools::analysis::{AnalysisClient, AnalysisError};

pub struct Application {
    pub config: AppConfig,
    pub role_store: Arc<RoleStore<FileStore>>,
    pub analysis: Arc<dyn AnalysisClient>,
    pub last_report: Arc<Mutex<Option<AuditReport>>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("analysis client construction failed: {0}")]
    Analysis(#[source] AnalysisError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let role_store = Arc::new(RoleStore::new(FileStore::new(&config.storage.session_path)));
    let analysis: Arc<dyn AnalysisClient> =
        Arc::new(GeminiClient::new(&config.analysis).map_err(BootstrapError::Analysis)?);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        analysis_ready = config.analysis_ready(),
        session_path = %config.storage.session_path.display(),
        "application bootstrap complete"
    );

    Ok(Application { config, role_store, analysis, last_report: Arc::new(Mutex::new(None)) })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use titledesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use titledesk_core::domain::role::Role;

    use super::bootstrap;

    #[tokio::test]
    async fn bootstrap_wires_a_working_role_store() {
        let dir = TempDir::new().expect("temp dir");
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                session_path: Some(dir.path().join("session.json")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap succeeds with defaults");

        app.role_store.set_role(Role::Agent).expect("writable store");
        assert_eq!(app.role_store.current_role().expect("readable store"), Role::Agent);
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let mut config = AppConfig::default();
        config.intake.orders_email = "not-an-email".to_string();
        assert!(config.validate().is_err(), "validation catches the bad address");
    }
}
