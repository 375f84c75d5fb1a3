use std::process::ExitCode;

use tracing::{error, info};

use stowage::{BlobStore, Config, Database, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = stowage::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        stowage::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    info!("Stowage - file storage backend");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(&config.database.path).await?;
    info!(path = %config.database.path, "Database opened");

    let storage = BlobStore::new(&config.storage.path, config.storage.max_upload_bytes())?;
    info!(
        path = %config.storage.path,
        max_upload_mb = config.storage.max_upload_size_mb,
        "Blob store ready"
    );

    let server = WebServer::new(&config, db, storage)?;
    server.run().await?;
    Ok(())
}
