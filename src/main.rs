use std::error::Error;
use ticket_booking::{
    app_state::AppState,
    config::Config,
    seed::seed_sample_events,
    server::{router, serve},
    store::ActiveStore,
};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();

    info!(
        exclusivity = %config.exclusivity,
        lock_timeout_ms = config.lock_timeout.as_millis() as u64,
        max_attempts = config.max_attempts,
        "Starting up"
    );
    let store = ActiveStore::default();
    if config.seed_sample_data {
        seed_sample_events(&store).await?;
    }

    let app = router(
        AppState::new(store, config.coordinator()),
        config.cors_layer()?,
    );

    serve(&config.bind_addr(), app, async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully...");
    })
    .await?;

    Ok(())
}
