use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::time::Duration;

/// How often elapsed rate limit windows are dropped.
const RATE_LIMIT_PURGE_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting up remote view server");

    let app_state = AppState::new(config);

    let producers = match service::init_exports(&app_state).await {
        Ok(producers) => producers,
        Err(e) => {
            error!("Failed to register exports: {e}");
            std::process::exit(1);
        }
    };
    info!(
        "Serving exports {:?} ({} file-backed)",
        app_state.exports.names(),
        producers.len()
    );

    service::spawn_rate_limit_purge(&app_state, RATE_LIMIT_PURGE_PERIOD);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
