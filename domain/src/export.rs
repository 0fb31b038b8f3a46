use crate::error::Error;
use dashmap::DashMap;
use events::{DomainEvent, EventPublisher};
use log::*;
use snapshot::{Clock, Snapshot, SystemClock, VersionedBuffer};
use std::sync::Arc;
use std::time::Duration;

/// Suffix of the image endpoint and notification topic of every export.
pub const IMAGE_SUFFIX: &str = ".png";

/// Names that collide with fixed routes.
const RESERVED_NAMES: &[&str] = &["health"];

/// A named snapshot published to remote clients.
pub struct Export {
    name: String,
    topic: String,
    min_update_period: Duration,
    buffer: VersionedBuffer,
}

impl Export {
    fn new(name: &str, min_update_period: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.to_string(),
            topic: topic_for(name),
            min_update_period,
            buffer: VersionedBuffer::with_clock(clock),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Notification topic, also the image endpoint name: `<name>.png`.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Lower bound for both producer periods and client refresh periods.
    pub fn min_update_period(&self) -> Duration {
        self.min_update_period
    }

    /// Long-poll read of this export's buffer.
    pub async fn await_newer_than(&self, min_version: u64, timeout: Option<Duration>) -> Snapshot {
        self.buffer.await_newer_than(min_version, timeout).await
    }

    pub fn snapshot(&self) -> Snapshot {
        self.buffer.snapshot()
    }

    pub fn version(&self) -> u64 {
        self.buffer.version()
    }
}

pub fn topic_for(name: &str) -> String {
    format!("{name}{IMAGE_SUFFIX}")
}

// Names end up in URL paths, cookie names and the landing page markup.
fn validate_name(name: &str) -> Result<(), Error> {
    let routable = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if name.is_empty()
        || !routable
        || name.ends_with(IMAGE_SUFFIX)
        || RESERVED_NAMES.contains(&name)
    {
        return Err(Error::invalid_export_name(name));
    }
    Ok(())
}

/// Owns every registered export and drives its lifecycle.
pub struct ExportRegistry {
    exports: DashMap<String, Arc<Export>>,
    event_publisher: EventPublisher,
    clock: Arc<dyn Clock>,
}

impl ExportRegistry {
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self::with_clock(event_publisher, Arc::new(SystemClock))
    }

    pub fn with_clock(event_publisher: EventPublisher, clock: Arc<dyn Clock>) -> Self {
        Self {
            exports: DashMap::new(),
            event_publisher,
            clock,
        }
    }

    /// Register an export and its notification topic.
    ///
    /// Registering a name that already exists returns the existing export
    /// untouched: its buffer, version and subscribers are kept and the new
    /// `min_update_period` is ignored.
    pub async fn register(&self, name: &str, min_update_period: Duration) -> Result<Arc<Export>, Error> {
        validate_name(name)?;

        if let Some(existing) = self.exports.get(name) {
            debug!("Export {name} already registered");
            return Ok(existing.clone());
        }

        let export = self
            .exports
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Export::new(name, min_update_period, self.clock.clone())))
            .clone();

        self.event_publisher
            .publish(DomainEvent::ExportRegistered {
                topic: export.topic().to_string(),
            })
            .await;

        info!(
            "Registered export {} (min update period {:?})",
            name, min_update_period
        );
        Ok(export)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Export>, Error> {
        self.exports
            .get(name)
            .map(|export| export.clone())
            .ok_or_else(|| Error::unknown_topic(name))
    }

    /// Publish a new snapshot for an export and notify its subscribers.
    pub async fn publish(&self, name: &str, data: &[u8]) -> Result<u64, Error> {
        let export = self.get(name)?;
        let version = export.buffer.publish(data);

        self.event_publisher
            .publish(DomainEvent::SnapshotPublished {
                topic: export.topic().to_string(),
                version,
            })
            .await;

        Ok(version)
    }

    /// Remove an export. Readers already waiting on it finish with the last
    /// published snapshot; streaming subscribers are disconnected.
    pub async fn teardown(&self, name: &str) -> Result<(), Error> {
        let (_, export) = self
            .exports
            .remove(name)
            .ok_or_else(|| Error::unknown_topic(name))?;

        self.event_publisher
            .publish(DomainEvent::ExportTornDown {
                topic: export.topic().to_string(),
            })
            .await;

        info!("Tore down export {name}");
        Ok(())
    }

    /// Registered export names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
