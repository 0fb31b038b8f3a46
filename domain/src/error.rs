//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums. The `source` field holds the original error, if any. `web` turns the
/// kinds into HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    Client(ClientErrorKind),
}

/// Errors caused by server-side setup or collaborators.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// An operation referenced an export/topic that is not registered.
    UnknownTopic(String),
    /// An export name that cannot be routed.
    InvalidExportName(String),
    /// The snapshot source failed to deliver bytes.
    Source(String),
    Other(String),
}

/// Errors caused by what a client sent.
#[derive(Debug, PartialEq)]
pub enum ClientErrorKind {
    /// The last-seen version token could not be parsed.
    MalformedVersionToken,
    /// The client exceeded its request budget.
    RateLimitExceeded,
}

impl Error {
    pub fn unknown_topic(topic: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::UnknownTopic(
                topic.to_string(),
            )),
        }
    }

    pub fn invalid_export_name(name: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::InvalidExportName(
                name.to_string(),
            )),
        }
    }

    pub fn malformed_version_token(source: std::num::ParseIntError) -> Self {
        Error {
            source: Some(Box::new(source)),
            error_kind: DomainErrorKind::Client(ClientErrorKind::MalformedVersionToken),
        }
    }

    pub fn rate_limit_exceeded() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Client(ClientErrorKind::RateLimitExceeded),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Snapshot sources backed by files or pipes surface I/O failures.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Source(message)),
        }
    }
}
