//! Versioned, double-buffered snapshot storage.
//!
//! A [`VersionedBuffer`] holds the most recently published encoded snapshot of
//! one export. A single producer publishes new payloads while any number of
//! long-poll readers wait for a version newer than the one they last saw.
//!
//! # Guarantees
//!
//! - The buffer pair is only reachable through the [`VersionedBuffer`] API;
//!   readers always receive an owned copy of the active buffer.
//! - A returned [`Snapshot`] pairs a version with exactly the payload that
//!   produced it.
//! - Versions are wall-clock milliseconds from a [`Clock`], made strictly
//!   increasing across publishes.
//!
//! # Modules
//!
//! - `clock`: the time source seam (`SystemClock`, `ManualClock`)
//! - `versioned_buffer`: the ping-pong buffer pair and its long-poll read

pub mod clock;
pub mod versioned_buffer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use versioned_buffer::{Snapshot, VersionedBuffer};
