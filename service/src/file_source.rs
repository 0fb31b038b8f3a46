use async_trait::async_trait;
use domain::error::Error;
use domain::producer::SnapshotSource;
use std::path::PathBuf;

/// Reads an encoded snapshot that an external renderer keeps rewriting.
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn capture(&self) -> Result<Vec<u8>, Error> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}
