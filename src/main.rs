use std::sync::Arc;

use tracing::{error, info, warn};

use drivesync::storage::{token_provider_from_config, DriveClient, RemoteStorage};
use drivesync::{
    start_mirror_poller, Config, FolderResolver, MirrorPoller, UploadDispatcher, WebServer,
};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DRIVESYNC_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = drivesync::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        drivesync::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("drivesync starting");
    if config.drive.root_folder_id.trim().is_empty() {
        warn!("ROOT_FOLDER_ID is not set; polling and uploads will fail until it is configured");
    }

    let tokens = token_provider_from_config(&config.drive);
    let storage: Arc<dyn RemoteStorage> = match DriveClient::new(&config.drive, tokens) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create Drive client: {}", e);
            std::process::exit(1);
        }
    };

    if config.mirror.enabled {
        match MirrorPoller::from_config(storage.clone(), &config) {
            Ok(poller) => {
                start_mirror_poller(poller);
            }
            Err(e) => error!("Failed to start mirror poller: {}", e),
        }
    } else {
        info!("Mirror poller disabled");
    }

    let resolver = Arc::new(FolderResolver::new(storage.clone()));
    let dispatcher = Arc::new(UploadDispatcher::new(storage, resolver, &config));

    let server = match WebServer::new(&config.web, dispatcher) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
