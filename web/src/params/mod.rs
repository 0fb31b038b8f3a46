//! This module holds typed parameters for the export endpoint inputs.
//!
//! Version tokens and refresh periods arrive as raw strings so that a
//! malformed value can be recovered locally instead of rejecting the request.

pub(crate) mod export;
