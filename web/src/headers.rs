//! Response headers and cookies shared by the export endpoints.

use axum::http::{header, HeaderMap, HeaderName};

/// Prefix of the cookies that carry the last version a client has seen.
pub(crate) const LAST_UPDATE: &str = "LastUpdate.";

pub(crate) const NO_CACHE: [(HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

pub(crate) fn last_update_cookie_name(endpoint: &str) -> String {
    format!("{LAST_UPDATE}{endpoint}")
}

/// Session cookie (no Expires/Max-Age) scoped to the whole server.
pub(crate) fn long_polling_cookie(name: &str, value: u64) -> String {
    format!("{name}={value}; Path=/; SameSite=Strict")
}

/// Value of cookie `name` from any `Cookie` header of the request.
pub(crate) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

pub(crate) fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|accept| accept.contains("text/event-stream"))
}
