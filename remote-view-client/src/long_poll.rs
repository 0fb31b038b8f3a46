use anyhow::{Context, Result};
use log::*;

/// Prefix of the cookie the server uses to round-trip the last seen version.
const LAST_UPDATE: &str = "LastUpdate.";

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub bytes: Vec<u8>,
}

/// Long-polls the image of one export. The cookie store keeps the version
/// token between requests, exactly as a browser would.
pub struct LongPollClient {
    client: reqwest::Client,
    url: String,
    cookie_name: String,
}

impl LongPollClient {
    pub fn new(base_url: &str, export: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/{}.png", base_url.trim_end_matches('/'), export),
            cookie_name: format!("{LAST_UPDATE}{export}.png"),
        })
    }

    /// Blocks until the server has a snapshot newer than the one last
    /// fetched, or until the server side wait times out.
    pub async fn next_snapshot(&self) -> Result<Snapshot> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?
            .error_for_status()?;

        let version = response
            .cookies()
            .find(|cookie| cookie.name() == self.cookie_name)
            .and_then(|cookie| cookie.value().parse::<u64>().ok())
            .with_context(|| format!("Response carries no {} cookie", self.cookie_name))?;

        let bytes = response.bytes().await?.to_vec();
        debug!("Fetched version {} ({} bytes)", version, bytes.len());

        Ok(Snapshot { version, bytes })
    }
}
