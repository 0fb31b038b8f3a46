use config::Config;
use domain::error::Error;
use domain::export::ExportRegistry;
use domain::producer::spawn_producer;
use domain::rate_limiter::RateLimiter;
use events::EventPublisher;
use file_source::FileSnapshotSource;
use log::{info, trace};
use sse::SseDomainEventHandler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub mod config;
pub mod file_source;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub exports: Arc<ExportRegistry>,
    pub sse_manager: Arc<sse::Manager>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires the export registry to the SSE manager through the event
    /// publisher, so every publish pings the export's subscribers.
    pub fn new(app_config: Config) -> Self {
        let sse_manager = Arc::new(sse::Manager::new());
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(sse_manager.clone())));

        Self::with_parts(
            app_config,
            Arc::new(ExportRegistry::new(event_publisher)),
            sse_manager,
        )
    }

    pub fn with_parts(
        app_config: Config,
        exports: Arc<ExportRegistry>,
        sse_manager: Arc<sse::Manager>,
    ) -> Self {
        Self {
            config: app_config,
            exports,
            sse_manager,
            rate_limiter: Arc::new(RateLimiter::new()),
        }
    }
}

/// Registers every configured export and starts a producer for the ones
/// backed by a file. Returns the producer tasks.
pub async fn init_exports(app_state: &AppState) -> Result<Vec<JoinHandle<()>>, Error> {
    let config = &app_state.config;
    let mut producers = Vec::new();

    for spec in &config.exports {
        app_state
            .exports
            .register(&spec.name, config.min_update_period())
            .await?;

        if let Some(path) = &spec.source {
            info!("Export {} reads snapshots from {}", spec.name, path.display());
            producers.push(spawn_producer(
                app_state.exports.clone(),
                &spec.name,
                Arc::new(FileSnapshotSource::new(path.clone())),
                config.producer_period(),
            )?);
        }
    }

    Ok(producers)
}

/// Starts a task that drops elapsed rate limit windows every `period`, so
/// clients that stopped polling do not keep their buckets forever.
pub fn spawn_rate_limit_purge(app_state: &AppState, period: Duration) -> JoinHandle<()> {
    let rate_limiter = app_state.rate_limiter.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let purged = rate_limiter.purge_expired();
            trace!("Rate limit purge removed {purged} window(s)");
        }
    })
}
