use crate::clock::{Clock, SystemClock};
use bytes::Bytes;
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// An owned copy of the active buffer together with the version that
/// describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes: Bytes,
    pub version: u64,
}

/// The ping-pong pair. `version` always describes `active`.
#[derive(Debug, Default)]
struct BufferPair {
    active: Vec<u8>,
    staging: Vec<u8>,
    version: u64,
}

/// Single-writer / multi-reader double buffer with a version stamp.
///
/// Publishing fills the staging buffer, swaps it with the active one and
/// stamps a new version under one lock. Still under that lock, one owned
/// [`Snapshot`] of the new active buffer is broadcast through a `watch`
/// channel. Readers clone that snapshot, so every reader of a publish shares
/// the same single copy and nobody copies while the producer waits.
///
/// A reader returns the snapshot current when it is woken. If another
/// publish lands before a woken reader runs, the reader returns the later
/// one: the latest publish wins.
pub struct VersionedBuffer {
    pair: Mutex<BufferPair>,
    snapshot_tx: watch::Sender<Snapshot>,
    clock: Arc<dyn Clock>,
}

impl VersionedBuffer {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot {
            bytes: Bytes::new(),
            version: 0,
        });
        Self {
            pair: Mutex::new(BufferPair::default()),
            snapshot_tx,
            clock,
        }
    }

    /// Copies `data` into the staging buffer, makes it the active buffer and
    /// wakes every reader blocked in [`VersionedBuffer::await_newer_than`].
    ///
    /// Returns the version now describing the active buffer. Versions are
    /// the clock's current time, bumped past the previous version when the
    /// clock has not moved.
    pub fn publish(&self, data: &[u8]) -> u64 {
        let mut guard = self.lock();
        let pair = &mut *guard;

        pair.staging.clear();
        pair.staging.extend_from_slice(data);
        std::mem::swap(&mut pair.active, &mut pair.staging);

        pair.version = self.clock.now_millis().max(pair.version + 1);
        let version = pair.version;

        // Sent under the lock so the channel sees versions in publish order.
        self.snapshot_tx.send_replace(Snapshot {
            bytes: Bytes::copy_from_slice(&pair.active),
            version,
        });
        drop(guard);

        trace!("Published {} bytes as version {}", data.len(), version);
        version
    }

    /// Returns the current snapshot once its version is strictly greater than
    /// `min_version`.
    ///
    /// Returns immediately when the caller's token is already stale. Otherwise
    /// waits for the next publish and returns the snapshot that woke it, or
    /// once `timeout` elapses returns whatever is current, even if it is not
    /// newer. Dropping the returned future releases the wait.
    pub async fn await_newer_than(&self, min_version: u64, timeout: Option<Duration>) -> Snapshot {
        let mut snapshot_rx = self.snapshot_tx.subscribe();

        let newer = async {
            snapshot_rx
                .wait_for(|snapshot| snapshot.version > min_version)
                .await
                .map(|snapshot| (*snapshot).clone())
                .ok()
        };
        let woken = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, newer).await.ok().flatten(),
            None => newer.await,
        };

        woken.unwrap_or_else(|| {
            debug!("Long poll for version > {min_version} timed out, returning current snapshot");
            self.snapshot()
        })
    }

    /// Non-blocking handle on the active buffer and its version.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn version(&self) -> u64 {
        self.snapshot_tx.borrow().version
    }

    // The lock is never held across a panic-prone section, so a poisoned
    // pair is still consistent.
    fn lock(&self) -> MutexGuard<'_, BufferPair> {
        self.pair.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for VersionedBuffer {
    fn default() -> Self {
        Self::new()
    }
}
