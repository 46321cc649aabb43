use std::{process::ExitCode, sync::Arc};

use contact_persistence_csv::CsvContactRepository;
use contact_server_domain::app::construct_app;
use log::{debug, error, info, warn};

use crate::config::ServerConfig;

mod config;
mod logs;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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

    info!("Shutdown signal received. Preparing graceful exit...");
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logs::init_logger(config.log_file.as_ref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    }

    let contact_repository = match CsvContactRepository::open(&config.contacts_file).await {
        Ok(repo) => repo,
        Err(e) => {
            error!("Failed to open record file: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Using record file {}", contact_repository.path().display());

    let app = construct_app(Arc::new(Box::new(contact_repository)));

    info!("Starting application");

    if let Err(e) = contact_server_api::run(app, config.http_addr, shutdown_signal()).await {
        error!("HTTP API failed: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
