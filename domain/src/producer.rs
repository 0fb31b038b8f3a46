//! Periodic snapshot production.
//!
//! Rendering is outside this crate: a [`SnapshotSource`] hands over already
//! encoded bytes and [`spawn_producer`] publishes them on a fixed period.

use crate::error::Error;
use crate::export::ExportRegistry;
use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Delivers the encoded bytes of the next snapshot on demand.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn capture(&self) -> Result<Vec<u8>, Error>;
}

/// Spawn a task that captures from `source` and publishes to export `name`
/// every `period`. The period is floored at the export's minimum update
/// period. Failed captures are logged and skipped. The task ends once the
/// export is torn down.
pub fn spawn_producer(
    registry: Arc<ExportRegistry>,
    name: &str,
    source: Arc<dyn SnapshotSource>,
    period: Duration,
) -> Result<JoinHandle<()>, Error> {
    let export = registry.get(name)?;
    let period = period.max(export.min_update_period());
    let name = name.to_string();

    info!("Starting producer for export {name} every {period:?}");

    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let bytes = match source.capture().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Snapshot capture for export {name} failed: {e}");
                    continue;
                }
            };

            match registry.publish(&name, &bytes).await {
                Ok(version) => trace!("Export {name} now at version {version}"),
                Err(_) => {
                    info!("Export {name} is gone, stopping its producer");
                    break;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::EventPublisher;
    use snapshot::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        captures: AtomicU32,
        fail_every_other: bool,
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn capture(&self) -> Result<Vec<u8>, Error> {
            let n = self.captures.fetch_add(1, Ordering::SeqCst);
            if self.fail_every_other && n % 2 == 1 {
                return Err(std::io::Error::other("renderer busy").into());
            }
            Ok(n.to_be_bytes().to_vec())
        }
    }

    async fn registry() -> Arc<ExportRegistry> {
        let registry = Arc::new(ExportRegistry::with_clock(
            EventPublisher::new(),
            Arc::new(ManualClock::new(1000)),
        ));
        registry
            .register("status", Duration::from_millis(500))
            .await
            .unwrap();
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_publishes_each_period() {
        let registry = registry().await;
        let source = Arc::new(CountingSource {
            captures: AtomicU32::new(0),
            fail_every_other: false,
        });

        let handle = spawn_producer(
            registry.clone(),
            "status",
            source.clone(),
            Duration::from_secs(1),
        )
        .unwrap();

        // First tick fires immediately, then once per second.
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(source.captures.load(Ordering::SeqCst), 3);
        let snapshot = registry.get("status").unwrap().snapshot();
        assert_eq!(snapshot.bytes.as_ref(), 2u32.to_be_bytes());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_period_is_floored_at_min_update_period() {
        let registry = registry().await;
        let source = Arc::new(CountingSource {
            captures: AtomicU32::new(0),
            fail_every_other: false,
        });

        let handle = spawn_producer(
            registry.clone(),
            "status",
            source.clone(),
            Duration::from_millis(10),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(1250)).await;

        // Ticks at 0, 500 and 1000 ms.
        assert_eq!(source.captures.load(Ordering::SeqCst), 3);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_captures_are_skipped() {
        let registry = registry().await;
        let source = Arc::new(CountingSource {
            captures: AtomicU32::new(0),
            fail_every_other: true,
        });

        let handle = spawn_producer(
            registry.clone(),
            "status",
            source.clone(),
            Duration::from_secs(1),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;

        // Capture 0 published, capture 1 failed.
        let export = registry.get("status").unwrap();
        assert_eq!(export.snapshot().bytes.as_ref(), 0u32.to_be_bytes());
        assert_eq!(export.version(), 1000);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_stops_after_teardown() {
        let registry = registry().await;
        let source = Arc::new(CountingSource {
            captures: AtomicU32::new(0),
            fail_every_other: false,
        });
        let handle = spawn_producer(
            registry.clone(),
            "status",
            source,
            Duration::from_secs(1),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        registry.teardown("status").await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_spawn_for_unknown_export_fails() {
        let registry = registry().await;
        let source = Arc::new(CountingSource {
            captures: AtomicU32::new(0),
            fail_every_other: false,
        });

        assert!(spawn_producer(registry, "nonexistent", source, Duration::from_secs(1)).is_err());
    }
}
