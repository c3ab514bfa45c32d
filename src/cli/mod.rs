use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::app::build_router;
use crate::config::AppConfig;
use crate::database::Database;
use crate::services::{seed_service, LocalStorage, LogTransport};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "bastion-api")]
#[command(about = "Backend API with users, roles, audit trail, uploads and email templates")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Apply migrations, seed and serve HTTP (default)")]
    Serve,

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,

    #[command(about = "Create missing roles, email templates and the administrator")]
    Seed,
}

/// Text logs locally, JSON in deployed environments.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.environment.json_logs() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(&config);
    tracing::info!("Starting bastion-api in {:?} mode", config.environment);

    let database = Database::connect(&config)
        .await
        .context("failed to connect to the database")?;
    database.migrate().await.context("failed to apply migrations")?;

    let command = cli.command.unwrap_or(Commands::Serve);
    if command == Commands::Migrate {
        database.close().await;
        return Ok(());
    }

    let state = AppState::new(
        config.clone(),
        database.repositories(),
        Arc::new(LocalStorage::new(config.storage.uploads_dir.clone())),
        Arc::new(LogTransport::new(&config.mail)),
    )
    .with_database(database.clone());

    seed_service::run(&state).await.context("seeding failed")?;

    if command == Commands::Seed {
        database.close().await;
        return Ok(());
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(
        "Listening on http://{} (api under {})",
        bind_addr,
        config.server.api_prefix()
    );

    let app = build_router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::parse_from(["bastion-api"]);
        assert_eq!(cli.command, None);
        let cli = Cli::parse_from(["bastion-api", "migrate"]);
        assert_eq!(cli.command, Some(Commands::Migrate));
    }
}
