use crate::error::Error;
use crate::message::Event;
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

/// Topic names are export names with the image suffix, e.g. `status.png`.
pub type Topic = String;

/// Channel half the web layer drains into an SSE response stream.
pub type EventSender = UnboundedSender<Event>;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection information (no redundant connection_id)
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub topic: Topic,
    pub sender: EventSender,
}

/// Connection registry with dual indices for O(1) lookups.
///
/// Topics are registered explicitly and stay registered while empty, so an
/// empty topic can be told apart from one that never existed.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: registered topics and their connections - O(1)
    topic_index: DashMap<Topic, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            topic_index: DashMap::new(),
        }
    }

    /// Register a topic. Returns `false` if it already existed, in which case
    /// its connections are left untouched.
    pub fn register_topic(&self, topic: &str) -> bool {
        if self.topic_index.contains_key(topic) {
            return false;
        }
        let mut created = false;
        self.topic_index.entry(topic.to_string()).or_insert_with(|| {
            created = true;
            HashSet::new()
        });
        created
    }

    /// Remove a topic and every connection subscribed to it. Dropping the
    /// senders ends the corresponding SSE streams. Returns how many
    /// connections were closed.
    pub fn deregister_topic(&self, topic: &str) -> Result<usize, Error> {
        let (_, connection_ids) = self
            .topic_index
            .remove(topic)
            .ok_or_else(|| Error::unknown_topic(topic))?;

        for connection_id in connection_ids.iter() {
            self.connections.remove(connection_id);
        }

        Ok(connection_ids.len())
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topic_index.contains_key(topic)
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.topic_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Register a new connection under an existing topic - O(1)
    pub fn register(&self, topic: &str, sender: EventSender) -> Result<ConnectionId, Error> {
        // Holding the topic entry keeps a concurrent deregister_topic from
        // missing this connection.
        let mut connection_ids = self
            .topic_index
            .get_mut(topic)
            .ok_or_else(|| Error::unknown_topic(topic))?;

        let connection_id = ConnectionId::new();
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                topic: topic.to_string(),
                sender,
            },
        );
        connection_ids.insert(connection_id.clone());

        Ok(connection_id)
    }

    /// Unregister a connection from a topic - O(1). Returns `false` when the
    /// connection was already gone or belongs to another topic.
    pub fn unregister(&self, topic: &str, connection_id: &ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(connection_id, |_, info| info.topic == topic)
            .is_some();

        if removed {
            if let Some(mut entry) = self.topic_index.get_mut(topic) {
                entry.remove(connection_id);
            }
        }

        removed
    }

    /// Connections currently subscribed to a topic.
    pub fn connections_for_topic(&self, topic: &str) -> Result<Vec<ConnectionId>, Error> {
        self.topic_index
            .get(topic)
            .map(|ids| ids.iter().cloned().collect())
            .ok_or_else(|| Error::unknown_topic(topic))
    }

    /// Send an event to one connection. A failed delivery removes it.
    pub fn send_to_connection(&self, connection_id: &ConnectionId, event: Event) -> bool {
        let (delivered, topic) = match self.connections.get(connection_id) {
            Some(info) => (info.sender.send(event).is_ok(), info.topic.clone()),
            None => return false,
        };

        if !delivered {
            warn!(
                "Failed to send event to connection {}. Connection will be cleaned up.",
                connection_id.as_str()
            );
            self.unregister(&topic, connection_id);
        }

        delivered
    }

    /// Send an event to every connection of a topic - O(k) where k = topic's
    /// connections. Connections whose receiver is gone are removed and do not
    /// stop delivery to the others. Returns the number of deliveries.
    pub fn send_to_topic(&self, topic: &str, event: Event) -> Result<usize, Error> {
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let connection_ids = self
                .topic_index
                .get(topic)
                .ok_or_else(|| Error::unknown_topic(topic))?;

            for conn_id in connection_ids.iter() {
                if let Some(info) = self.connections.get(conn_id) {
                    match info.sender.send(event.clone()) {
                        Ok(()) => delivered += 1,
                        Err(_) => failed.push(conn_id.clone()),
                    }
                }
            }
        }

        for conn_id in failed {
            warn!(
                "Failed to send event to connection {} on topic {}. Connection will be cleaned up.",
                conn_id.as_str(),
                topic
            );
            self.unregister(topic, &conn_id);
        }

        Ok(delivered)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
