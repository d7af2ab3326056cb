mod bootstrap;
mod health;
pub mod site;

use anyhow::Result;
use titledesk_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use titledesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.port.saturating_add(1),
        health::HealthState {
            config: std::sync::Arc::new(app.config.clone()),
            role_store: app.role_store.clone(),
        },
    )
    .await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let router = site::router(&app);

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "titledesk-server started"
    );

    tokio::select! {
        result = axum::serve(listener, router) => {
            result?;
        }
        _ = wait_for_shutdown() => {}
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "titledesk-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
