use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use titledesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let api_key = if config.analysis.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "analysis.api_key",
        api_key,
        field_source(
            "analysis.api_key",
            Some("TITLEDESK_ANALYSIS_API_KEY"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "analysis.base_url",
        &config.analysis.base_url,
        field_source(
            "analysis.base_url",
            Some("TITLEDESK_ANALYSIS_BASE_URL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "analysis.model",
        &config.analysis.model,
        field_source(
            "analysis.model",
            Some("TITLEDESK_ANALYSIS_MODEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "analysis.timeout_secs",
        &config.analysis.timeout_secs.to_string(),
        field_source(
            "analysis.timeout_secs",
            Some("TITLEDESK_ANALYSIS_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "analysis.audit_temperature",
        &config.analysis.audit_temperature.to_string(),
        field_source(
            "analysis.audit_temperature",
            Some("TITLEDESK_ANALYSIS_AUDIT_TEMPERATURE"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "portals.buyer_url",
        &config.portals.buyer_url,
        field_source(
            "portals.buyer_url",
            Some("TITLEDESK_PORTALS_BUYER_URL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "portals.seller_url",
        &config.portals.seller_url,
        field_source(
            "portals.seller_url",
            Some("TITLEDESK_PORTALS_SELLER_URL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "intake.orders_email",
        &config.intake.orders_email,
        field_source(
            "intake.orders_email",
            Some("TITLEDESK_INTAKE_ORDERS_EMAIL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "storage.session_path",
        &config.storage.session_path.display().to_string(),
        field_source(
            "storage.session_path",
            Some("TITLEDESK_STORAGE_SESSION_PATH"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "storage.export_dir",
        &config.storage.export_dir.display().to_string(),
        field_source(
            "storage.export_dir",
            Some("TITLEDESK_STORAGE_EXPORT_DIR"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        field_source(
            "server.bind_address",
            Some("TITLEDESK_SERVER_BIND_ADDRESS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        field_source(
            "server.port",
            Some("TITLEDESK_SERVER_PORT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            Some("TITLEDESK_LOGGING_LEVEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            Some("TITLEDESK_LOGGING_FORMAT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("titledesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/titledesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
