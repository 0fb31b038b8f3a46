//! Fixed-window request limits keyed by client.

use crate::error::Error;
use dashmap::DashMap;
use log::*;
use std::time::Duration;
use tokio::time::Instant;

/// Per-client window state
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// A bucket is identified by the client and by the limit it is checked
/// against, so the same client can be under several independent limits.
type BucketKey = (String, u32, Duration);

/// Counts requests per client in fixed windows and rejects the ones above
/// the limit.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<BucketKey, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Admit one request from `client_key` if fewer than `limit` requests
    /// were admitted in the current `window`; otherwise fail with
    /// `RateLimitExceeded`.
    pub fn check(&self, client_key: &str, limit: u32, window: Duration) -> Result<(), Error> {
        let now = Instant::now();
        let mut state = self
            .windows
            .entry((client_key.to_string(), limit, window))
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });

        // Check if window has expired
        if now.duration_since(state.started) >= window {
            state.started = now;
            state.count = 0;
        }

        if state.count >= limit {
            debug!("Rate limit {limit}/{window:?} exceeded by {client_key}");
            return Err(Error::rate_limit_exceeded());
        }

        state.count += 1;
        Ok(())
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|(_, _, window), state| now.duration_since(state.started) < *window);
        let purged = before.saturating_sub(self.windows.len());
        if purged > 0 {
            trace!("Purged {purged} expired rate limit window(s)");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
