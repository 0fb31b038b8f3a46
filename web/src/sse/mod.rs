//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for export notification
//! streams. The fanout itself (Manager, ConnectionRegistry, Message types)
//! lives in the `sse` crate so that the service layer can wire it to domain
//! events without depending on the web layer.

pub mod handler;
