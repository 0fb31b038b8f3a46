//! Error types for the `sse` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the sse crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Kinds of errors raised by the notification fanout.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The operation referenced a topic that was never registered
    /// (or was already torn down).
    UnknownTopic(String),
}

impl Error {
    pub fn unknown_topic(topic: &str) -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::UnknownTopic(topic.to_string()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::UnknownTopic(topic) => write!(f, "SSE Error: topic '{topic}' not registered"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
