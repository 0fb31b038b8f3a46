use crate::extractors::client_key::ClientKey;
use crate::Error;
use ::sse::connection::ConnectionId;
use ::sse::Manager;
use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use domain::error::Error as DomainError;
use domain::export::Export;
use log::*;
use service::AppState;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unsubscribes its connection when the response stream is dropped, which
/// happens as soon as the client goes away.
struct Subscription {
    manager: Arc<Manager>,
    topic: String,
    connection_id: ConnectionId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(
            "SSE connection {} closed for topic {}, cleaning up",
            self.connection_id.as_str(),
            self.topic
        );
        self.manager.unsubscribe(&self.topic, &self.connection_id);
    }
}

/// Opens the notification stream of an export. The client first receives a
/// `connected` event, then a `PING <version>` for every published snapshot.
/// The stream ends when the export is torn down.
pub(crate) async fn sse_handler(
    app_state: &AppState,
    export: &Export,
    client_key: &ClientKey,
) -> Result<Response, Error> {
    let topic = export.topic().to_string();
    debug!("Establishing SSE connection to {topic} for client {client_key}");

    let (tx, mut rx) = mpsc::unbounded_channel();

    // The export may have been torn down since it was looked up.
    let connection_id = app_state
        .sse_manager
        .subscribe(&topic, tx)
        .map_err(|_| DomainError::unknown_topic(&topic))?;

    let subscription = Subscription {
        manager: app_state.sse_manager.clone(),
        topic,
        connection_id,
    };

    // Events arrive from the channel and are converted to wire events
    let stream = stream! {
        let _subscription = subscription;
        while let Some(event) = rx.recv().await {
            yield Ok::<Event, Infallible>(event.into());
        }
    };

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}
