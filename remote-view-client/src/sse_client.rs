use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub data: String,
    pub timestamp: Instant,
}

impl Event {
    /// Version announced by a `PING <version>` event.
    pub fn ping_version(&self) -> Option<u64> {
        parse_ping(&self.data)
    }
}

pub fn parse_ping(data: &str) -> Option<u64> {
    data.trim().strip_prefix("PING ")?.trim().parse().ok()
}

pub struct Connection {
    pub label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    /// Subscribes to the notification stream of `export`, served on the
    /// same path as its image.
    pub async fn establish(base_url: &str, export: &str, label: String) -> Result<Self> {
        let url = format!("{}/{}.png", base_url.trim_end_matches('/'), export);
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?
            .header("Accept", "text/event-stream")?
            .build();

        let stream_label = label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        let sse_event = Event {
                            event_type: event.event_type,
                            data: event.data,
                            timestamp: Instant::now(),
                        };

                        if tx.send(sse_event).is_err() {
                            debug!("SSE receiver dropped for {}", stream_label);
                            break;
                        }
                    }
                    Some(Ok(es::SSE::Comment(_))) => {
                        // Ignore comments (keep-alive)
                    }
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", stream_label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", stream_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            event_rx: rx,
            _handle: handle,
        })
    }

    pub async fn wait_for_event(&mut self, event_type: &str, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", event_type);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.event_type == event_type => {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    // Wrong event type, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", event_type);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        assert_eq!(parse_ping("PING 1000"), Some(1000));
        assert_eq!(parse_ping(" PING 42 \n"), Some(42));
        assert_eq!(parse_ping("connected"), None);
        assert_eq!(parse_ping("PING soon"), None);
    }
}
