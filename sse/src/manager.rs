use crate::connection::{ConnectionId, ConnectionRegistry, EventSender, Topic};
use crate::error::Error;
use crate::message::{Event, Message as SseMessage, MessageScope};
use log::*;
use std::sync::Arc;

/// Routes notifications to the streaming clients of each export topic.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Make a topic available for subscriptions. Registering an existing
    /// topic keeps its subscribers.
    pub fn register_topic(&self, topic: &str) {
        if self.registry.register_topic(topic) {
            info!("Registered SSE topic {topic}");
        } else {
            debug!("SSE topic {topic} already registered");
        }
    }

    /// Remove a topic, disconnecting every subscriber.
    pub fn deregister_topic(&self, topic: &str) -> Result<usize, Error> {
        let closed = self.registry.deregister_topic(topic)?;
        info!("Deregistered SSE topic {topic}, closed {closed} connection(s)");
        Ok(closed)
    }

    /// Register a new connection under `topic` and acknowledge it with a
    /// `connected` event.
    pub fn subscribe(&self, topic: &str, sender: EventSender) -> Result<ConnectionId, Error> {
        let connection_id = self.registry.register(topic, sender)?;
        info!(
            "Registered new SSE connection {} on topic {}",
            connection_id.as_str(),
            topic
        );

        self.send_message(SseMessage {
            event: Event::Connected,
            scope: MessageScope::Connection {
                connection_id: connection_id.clone(),
            },
        })?;

        Ok(connection_id)
    }

    /// Unregister a connection. Calling this for a connection that is already
    /// gone is a no-op.
    pub fn unsubscribe(&self, topic: &str, connection_id: &ConnectionId) {
        if self.registry.unregister(topic, connection_id) {
            info!(
                "Unregistered SSE connection {} from topic {}",
                connection_id.as_str(),
                topic
            );
        }
    }

    /// Tell every subscriber of `topic` that `version` is available.
    /// Returns the number of clients reached.
    pub fn notify(&self, topic: &str, version: u64) -> Result<usize, Error> {
        let delivered = self.send_message(SseMessage {
            event: Event::Ping { version },
            scope: MessageScope::Topic {
                topic: topic.to_string(),
            },
        })?;
        debug!("Sent PING {version} to {delivered} client(s) of {topic}");
        Ok(delivered)
    }

    /// Send a message based on its scope
    pub fn send_message(&self, message: SseMessage) -> Result<usize, Error> {
        match message.scope {
            MessageScope::Topic { topic } => self.registry.send_to_topic(&topic, message.event),
            MessageScope::Connection { connection_id } => Ok(usize::from(
                self.registry
                    .send_to_connection(&connection_id, message.event),
            )),
        }
    }

    pub fn clients_for_topic(&self, topic: &str) -> Result<Vec<ConnectionId>, Error> {
        self.registry.connections_for_topic(topic)
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.registry.topics()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
