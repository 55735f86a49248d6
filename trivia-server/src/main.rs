use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::info;

use trivia_core::RoundCatalog;
use trivia_server::{
    config::Config, create_routes, registry::RoomRegistry, websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Guess the Link server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    let catalog = match &config.image_sets_path {
        Some(path) => match RoundCatalog::from_json_file(path) {
            Ok(catalog) => {
                info!("Loaded {} image sets from {}", catalog.len(), path);
                catalog
            }
            Err(e) => {
                tracing::error!("Failed to load image sets from '{}': {}", path, e);
                tracing::error!(
                    "Set IMAGE_SETS_PATH to a JSON file containing an array of image sets, \
                     or unset it to use the built-in sets."
                );
                std::process::exit(1);
            }
        },
        None => {
            info!("IMAGE_SETS_PATH not set, using built-in image sets");
            RoundCatalog::new(RoundCatalog::default_sets()).expect("built-in sets are non-empty")
        }
    };

    let registry = Arc::new(RoomRegistry::new(
        connection_manager.clone(),
        catalog,
        config.room_config(),
    ));

    let routes = create_routes(connection_manager.clone(), registry.clone());

    // Periodic sweep of rooms nobody has touched in a while
    let sweep_registry = registry.clone();
    let max_idle = Duration::from_secs(config.room_idle_minutes * 60);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sweep_registry.sweep_idle(max_idle).await;
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config.host.parse::<std::net::IpAddr>().expect("Invalid HOST"),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
