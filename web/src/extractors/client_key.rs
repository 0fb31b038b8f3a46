use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use log::*;
use service::AppState;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const UNKNOWN_CLIENT: &str = "unknown";

/// Identifies the requesting client for rate limiting.
///
/// The peer address is the key. Only when the peer is a trusted proxy
/// (loopback or listed in `trusted_proxies`) does the first
/// `X-Forwarded-For` address, then `X-Real-IP`, replace it. Forwarding
/// headers from any other peer are ignored so a client cannot pick its own
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientKey(pub String);

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ClientKey {
    fn resolve(headers: &HeaderMap, peer: Option<IpAddr>, trusted: impl Fn(IpAddr) -> bool) -> Self {
        let Some(peer) = peer else {
            return ClientKey(UNKNOWN_CLIENT.to_string());
        };

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        if trusted(peer) {
            // Take first IP (client IP)
            let forwarded = header("x-forwarded-for")
                .and_then(|forwarded_for| forwarded_for.split(',').next())
                .map(str::trim)
                .filter(|client| !client.is_empty());

            if let Some(client) = forwarded.or_else(|| header("x-real-ip")) {
                return ClientKey(client.to_string());
            }
        } else if headers.contains_key("x-forwarded-for") || headers.contains_key("x-real-ip") {
            debug!("Ignoring forwarding headers from untrusted peer {peer}");
        }

        ClientKey(peer.to_string())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientKey::resolve(&parts.headers, peer, |ip| {
            state.config.is_trusted_proxy(ip)
        }))
    }
}
