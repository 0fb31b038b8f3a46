use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use domain::error::{ClientErrorKind, DomainErrorKind, Error as DomainError, InternalErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match &internal_error_kind {
                InternalErrorKind::UnknownTopic(topic) => {
                    debug!("Request for unknown export {topic}");
                    (StatusCode::NOT_FOUND, "NOT FOUND").into_response()
                }
                InternalErrorKind::InvalidExportName(_)
                | InternalErrorKind::Source(_)
                | InternalErrorKind::Other(_) => {
                    error!("Internal error: {internal_error_kind:?}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            DomainErrorKind::Client(client_error_kind) => match client_error_kind {
                ClientErrorKind::MalformedVersionToken => {
                    (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
                }
                ClientErrorKind::RateLimitExceeded => {
                    (StatusCode::TOO_MANY_REQUESTS, "TOO MANY REQUESTS").into_response()
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_topic_is_not_found() {
        let response = Error::from(DomainError::unknown_topic("nonexistent")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rate_limit_is_too_many_requests() {
        let response = Error::from(DomainError::rate_limit_exceeded()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_malformed_token_is_bad_request() {
        let parse_error = "abc".parse::<u64>().unwrap_err();
        let response = Error::from(DomainError::malformed_version_token(parse_error)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_source_failure_is_internal_error() {
        let io = std::io::Error::other("disk gone");
        let response = Error::from(DomainError::from(io)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
