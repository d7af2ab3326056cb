use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub portals: PortalsConfig,
    pub intake: IntakeConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub audit_temperature: f64,
}

#[derive(Clone, Debug)]
pub struct PortalsConfig {
    pub buyer_url: String,
    pub seller_url: String,
}

#[derive(Clone, Debug)]
pub struct IntakeConfig {
    pub orders_email: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub session_path: PathBuf,
    pub export_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub analysis_api_key: Option<String>,
    pub analysis_model: Option<String>,
    pub orders_email: Option<String>,
    pub session_path: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig {
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: 60,
                audit_temperature: 0.2,
            },
            portals: PortalsConfig {
                buyer_url: "https://buyers.worldclasstitle.com".to_string(),
                seller_url: "https://sellers.worldclasstitle.com".to_string(),
            },
            intake: IntakeConfig { orders_email: "orders@worldclasstitle.com".to_string() },
            storage: StorageConfig {
                session_path: PathBuf::from("titledesk-session.json"),
                export_dir: PathBuf::from("."),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("titledesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(analysis) = patch.analysis {
            if let Some(analysis_api_key_value) = analysis.api_key {
                self.analysis.api_key = Some(secret_value(analysis_api_key_value));
            }
            if let Some(base_url) = analysis.base_url {
                self.analysis.base_url = base_url;
            }
            if let Some(model) = analysis.model {
                self.analysis.model = model;
            }
            if let Some(timeout_secs) = analysis.timeout_secs {
                self.analysis.timeout_secs = timeout_secs;
            }
            if let Some(audit_temperature) = analysis.audit_temperature {
                self.analysis.audit_temperature = audit_temperature;
            }
        }

        if let Some(portals) = patch.portals {
            if let Some(buyer_url) = portals.buyer_url {
                self.portals.buyer_url = buyer_url;
            }
            if let Some(seller_url) = portals.seller_url {
                self.portals.seller_url = seller_url;
            }
        }

        if let Some(intake) = patch.intake {
            if let Some(orders_email) = intake.orders_email {
                self.intake.orders_email = orders_email;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(session_path) = storage.session_path {
                self.storage.session_path = session_path;
            }
            if let Some(export_dir) = storage.export_dir {
                self.storage.export_dir = export_dir;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TITLEDESK_ANALYSIS_API_KEY") {
            self.analysis.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TITLEDESK_ANALYSIS_BASE_URL") {
            self.analysis.base_url = value;
        }
        if let Some(value) = read_env("TITLEDESK_ANALYSIS_MODEL") {
            self.analysis.model = value;
        }
        if let Some(value) = read_env("TITLEDESK_ANALYSIS_TIMEOUT_SECS") {
            self.analysis.timeout_secs = parse_u64("TITLEDESK_ANALYSIS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TITLEDESK_ANALYSIS_AUDIT_TEMPERATURE") {
            self.analysis.audit_temperature =
                parse_f64("TITLEDESK_ANALYSIS_AUDIT_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("TITLEDESK_PORTALS_BUYER_URL") {
            self.portals.buyer_url = value;
        }
        if let Some(value) = read_env("TITLEDESK_PORTALS_SELLER_URL") {
            self.portals.seller_url = value;
        }

        if let Some(value) = read_env("TITLEDESK_INTAKE_ORDERS_EMAIL") {
            self.intake.orders_email = value;
        }

        if let Some(value) = read_env("TITLEDESK_STORAGE_SESSION_PATH") {
            self.storage.session_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("TITLEDESK_STORAGE_EXPORT_DIR") {
            self.storage.export_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("TITLEDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TITLEDESK_SERVER_PORT") {
            self.server.port = parse_u16("TITLEDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TITLEDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TITLEDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("TITLEDESK_LOGGING_LEVEL").or_else(|| read_env("TITLEDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TITLEDESK_LOGGING_FORMAT").or_else(|| read_env("TITLEDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(analysis_api_key) = overrides.analysis_api_key {
            self.analysis.api_key = Some(secret_value(analysis_api_key));
        }
        if let Some(analysis_model) = overrides.analysis_model {
            self.analysis.model = analysis_model;
        }
        if let Some(orders_email) = overrides.orders_email {
            self.intake.orders_email = orders_email;
        }
        if let Some(session_path) = overrides.session_path {
            self.storage.session_path = session_path;
        }
        if let Some(export_dir) = overrides.export_dir {
            self.storage.export_dir = export_dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_analysis(&self.analysis)?;
        validate_portals(&self.portals)?;
        validate_intake(&self.intake)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Whether the analysis service is configured well enough to call.
    pub fn analysis_ready(&self) -> bool {
        self.analysis
            .api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("titledesk.toml"), PathBuf::from("config/titledesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), ConfigError> {
    if analysis.timeout_secs == 0 || analysis.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "analysis.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&analysis.audit_temperature) {
        return Err(ConfigError::Validation(
            "analysis.audit_temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if analysis.model.trim().is_empty() {
        return Err(ConfigError::Validation("analysis.model must not be empty".to_string()));
    }

    if !analysis.base_url.starts_with("http://") && !analysis.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "analysis.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_portals(portals: &PortalsConfig) -> Result<(), ConfigError> {
    for (key, url) in [("portals.buyer_url", &portals.buyer_url), ("portals.seller_url", &portals.seller_url)]
    {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_intake(intake: &IntakeConfig) -> Result<(), ConfigError> {
    let email = intake.orders_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ConfigError::Validation(
            "intake.orders_email must be a non-empty email address".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    analysis: Option<AnalysisPatch>,
    portals: Option<PortalsPatch>,
    intake: Option<IntakePatch>,
    storage: Option<StoragePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    audit_temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PortalsPatch {
    buyer_url: Option<String>,
    seller_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IntakePatch {
    orders_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    session_path: Option<PathBuf>,
    export_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ANALYSIS_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("titledesk.toml");
            fs::write(
                &path,
                r#"
[analysis]
api_key = "${TEST_ANALYSIS_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let key = config
                .analysis
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string())
                .unwrap_or_default();
            ensure(key == "key-from-env", "api key should be loaded from environment")?;
            ensure(config.analysis_ready(), "config with a key should report analysis ready")?;
            Ok(())
        })();

        clear_vars(&["TEST_ANALYSIS_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TITLEDESK_LOG_LEVEL", "warn");
        env::set_var("TITLEDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["TITLEDESK_LOG_LEVEL", "TITLEDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TITLEDESK_ANALYSIS_MODEL", "model-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("titledesk.toml");
            fs::write(
                &path,
                r#"
[analysis]
model = "model-from-file"

[intake]
orders_email = "file@worldclasstitle.com"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.analysis.model == "model-from-env", "env model should win over file")?;
            ensure(
                config.intake.orders_email == "file@worldclasstitle.com",
                "file email should win over defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["TITLEDESK_ANALYSIS_MODEL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TITLEDESK_INTAKE_ORDERS_EMAIL", "not-an-email");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("intake.orders_email")
            );
            ensure(has_message, "validation failure should mention intake.orders_email")
        })();

        clear_vars(&["TITLEDESK_INTAKE_ORDERS_EMAIL"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TITLEDESK_ANALYSIS_API_KEY", "super-secret-key");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("super-secret-key"), "debug output should not contain key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["TITLEDESK_ANALYSIS_API_KEY"]);
        result
    }

    #[test]
    fn missing_key_reports_analysis_not_ready() {
        let config = AppConfig::default();
        assert!(!config.analysis_ready());
    }
}
