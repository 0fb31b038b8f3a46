//! Export lifecycle and request guards for the remote view server.
//!
//! An *export* is a named snapshot published to remote clients. Each export
//! owns one [`snapshot::VersionedBuffer`] and one notification topic
//! (`<export>.png`). The [`export::ExportRegistry`] moves exports through
//! their lifecycle (`Unregistered -> Registered -> Torn down`) and emits
//! [`events::DomainEvent`]s so that delivery layers (SSE) stay decoupled from
//! publication.

pub use snapshot::{Clock, ManualClock, Snapshot, SystemClock, VersionedBuffer};

pub mod error;
pub mod export;
pub mod producer;
pub mod rate_limiter;
