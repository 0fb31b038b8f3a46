/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Events pushed to streaming clients of an export topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Acknowledgement sent once, right after a client subscribes.
    Connected,
    /// A new snapshot version is available for long-polling.
    Ping { version: u64 },
}

impl Event {
    /// The `data:` line of the event as sent on the wire.
    pub fn data(&self) -> String {
        match self {
            Event::Connected => "connected".to_string(),
            Event::Ping { version } => format!("PING {version}"),
        }
    }
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::Connected => "connected",
            // Pings use the default event name so that a plain
            // `EventSource.onmessage` handler receives them.
            Event::Ping { .. } => "message",
        }
    }
}

impl From<Event> for axum::response::sse::Event {
    fn from(event: Event) -> Self {
        axum::response::sse::Event::default()
            .event(event.event_type())
            .data(event.data())
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to every connection subscribed to a topic
    Topic { topic: String },
    /// Send to a single connection
    Connection {
        connection_id: crate::connection::ConnectionId,
    },
}
