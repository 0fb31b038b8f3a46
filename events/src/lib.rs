//! Event system infrastructure for the remote view server.
//!
//! This crate provides the event system that decouples snapshot publication
//! (the `domain` crate) from delivery concerns like SSE notifications.
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all export lifecycle events
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies between `domain` and `sse`.

use async_trait::async_trait;
use std::sync::Arc;

/// Domain events emitted by the export registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// Emitted when an export is registered. Makes its notification topic
    /// available for SSE subscriptions.
    ExportRegistered { topic: String },
    /// Emitted after a new snapshot became the active buffer of an export.
    /// Triggers a `PING <version>` to every SSE client of the topic.
    SnapshotPublished {
        /// Notification topic of the export (`<export>.png`).
        topic: String,
        /// Version now describing the export's active buffer.
        version: u64,
    },
    /// Emitted when an export is removed. Subscribers of its topic are
    /// disconnected.
    ExportTornDown { topic: String },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, sequentially.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
