use axum::http::{header, HeaderValue, Method};
use log::*;
use service::AppState;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use self::error::{Error, Result};

mod controller;
mod error;
mod extractors;
mod headers;
mod params;
pub mod router;
mod sse;

pub async fn init_server(app_state: AppState) -> Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );
    let listener = TcpListener::bind(&server_url).await?;

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    // Cookies carry the long-poll version token, so credentials are allowed
    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_credentials(true)
        .allow_headers([header::ACCEPT, header::CACHE_CONTROL, header::COOKIE])
        .allow_origin(allowed_origins);

    info!(
        "Server starting... listening for connections on http://{server_url} (environment: {})",
        app_state.config.runtime_env()
    );

    axum::serve(
        listener,
        router::define_routes(app_state)
            .layer(cors_layer)
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
