use pendulum_server::api::router;
use pendulum_server::clock::Clock;
use pendulum_server::config::ServerConfig;
use pendulum_server::state::AppState;
use pendulum_server::store::MemoryStore;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let store = Arc::new(MemoryStore::new());
    let app_state = AppState::new(store, &config, Clock::system());
    let coordinator = app_state.coordinator.clone();
    let app = router(app_state);

    tracing::info!(
        "Starting pendulum server on {} (cooldown {}ms)",
        config.listen_addr,
        config.cooldown_ms
    );
    println!("Pendulum server listening on {}", config.listen_addr);

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    coordinator.shutdown().await;
    tracing::info!("Pendulum server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
