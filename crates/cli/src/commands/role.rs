use std::str::FromStr;

use titledesk_core::config::{AppConfig, ConfigError, LoadOptions};
use titledesk_core::domain::role::Role;
use titledesk_core::session::{FileStore, RoleStore};

use crate::commands::CommandResult;

const COMMAND: &str = "role";

pub fn get() -> CommandResult {
    let store = match open_store() {
        Ok(store) => store,
        Err(error) => return config_failure(error),
    };

    match store.current_role() {
        Ok(role) => CommandResult::success(
            COMMAND,
            format!("current role: {} ({})", role.storage_value(), role.display_name()),
        ),
        Err(error) => CommandResult::failure(COMMAND, "session_store", error.to_string(), 4),
    }
}

pub fn set(value: &str) -> CommandResult {
    let role = match Role::from_str(value) {
        Ok(role) => role,
        Err(error) => return CommandResult::failure(COMMAND, "unknown_role", error.to_string(), 3),
    };

    let store = match open_store() {
        Ok(store) => store,
        Err(error) => return config_failure(error),
    };

    match store.set_role(role) {
        Ok(()) => CommandResult::success(
            COMMAND,
            format!("role remembered: {}", role.storage_value()),
        ),
        Err(error) => CommandResult::failure(COMMAND, "session_store", error.to_string(), 4),
    }
}

pub fn clear() -> CommandResult {
    let store = match open_store() {
        Ok(store) => store,
        Err(error) => return config_failure(error),
    };

    match store.clear_role() {
        Ok(()) => CommandResult::success(COMMAND, "remembered role cleared"),
        Err(error) => CommandResult::failure(COMMAND, "session_store", error.to_string(), 4),
    }
}

fn open_store() -> Result<RoleStore<FileStore>, ConfigError> {
    let config = AppConfig::load(LoadOptions::default())?;
    Ok(RoleStore::new(FileStore::new(&config.storage.session_path)))
}

fn config_failure(error: ConfigError) -> CommandResult {
    CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
}
