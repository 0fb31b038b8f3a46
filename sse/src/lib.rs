//! Server-Sent Events (SSE) notification fanout for snapshot exports.
//!
//! Every export publishes on one topic (`<export>.png`). Streaming clients
//! subscribe to a topic and receive a lightweight `PING <version>` whenever a
//! new snapshot is published; they then fetch the bytes through the
//! long-poll endpoint.
//!
//! # Architecture
//!
//! - **Explicit topics**: topics are registered when an export is registered
//!   and deregistered on teardown. Unknown topics are an error, empty topics
//!   are not.
//! - **Dual-index registry**: O(1) lookups for both connection management and
//!   topic-scoped routing via separate DashMap indices.
//! - **Ephemeral messages**: a client that is not connected misses the ping
//!   and picks up the current snapshot on its next long poll.
//! - **Isolated failures**: a client whose stream is gone is removed on the
//!   next delivery attempt without affecting other clients.
//!
//! # Message Flow
//!
//! 1. Client opens `GET /<export>.png` with `Accept: text/event-stream`
//! 2. The web layer creates a channel and calls `Manager::subscribe`
//! 3. The client immediately receives a `connected` event
//! 4. On each publish the domain layer emits `DomainEvent::SnapshotPublished`
//! 5. `SseDomainEventHandler` calls `Manager::notify`, which pings the topic
//! 6. When the client disconnects the stream is dropped and unsubscribed
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture and type-safe ConnectionId
//! - `manager`: High-level message routing (delegates to ConnectionRegistry)
//! - `message`: Typed event and scope definitions
//! - `domain_event_handler`: bridges domain events to notifications
//! - `error`: the UnknownTopic error

pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod manager;
pub mod message;

pub use domain_event_handler::SseDomainEventHandler;
pub use manager::Manager;
