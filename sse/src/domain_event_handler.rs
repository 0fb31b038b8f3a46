use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by turning them into SSE notifications.
///
/// `ExportRegistered` makes the topic available for subscriptions,
/// `SnapshotPublished` becomes a `PING <version>` for every subscriber of the
/// topic; `ExportTornDown` removes the topic and closes its streams.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::ExportRegistered { topic } => {
                self.sse_manager.register_topic(topic);
            }

            DomainEvent::SnapshotPublished { topic, version } => {
                if let Err(e) = self.sse_manager.notify(topic, *version) {
                    warn!("Dropping PING {version}: {e}");
                }
            }

            DomainEvent::ExportTornDown { topic } => {
                debug!("Handling ExportTornDown event for topic {topic}");
                if let Err(e) = self.sse_manager.deregister_topic(topic) {
                    warn!("Topic teardown skipped: {e}");
                }
            }
        }
    }
}
