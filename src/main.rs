use deploy_failure_relay::AppState;
use deploy_failure_relay::api::{WEBHOOK_PATH, build_router};
use deploy_failure_relay::config::{DEFAULT_CONFIG_PATH, load_config};
use deploy_failure_relay::logging::{FileLogger, setup_logging};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path = PathBuf::from(
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg.apply_env(),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let file_logger = config.server.log_directory.clone().map(FileLogger::new);
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    let missing = config.missing_secrets();
    if missing.any() {
        // Keep serving so every delivery gets a 500 naming what is missing.
        error!("Missing required configuration: {}", missing);
    }

    let bind_address = config.server.bind_address.clone();
    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to build API clients: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    info!("Webhook endpoint: POST {}", WEBHOOK_PATH);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
