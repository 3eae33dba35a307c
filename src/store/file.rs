//! JSON Lines backed state store.

use super::{IpObservation, StateStore};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// State store keeping one JSON object per line in a local file.
///
/// Lines are only ever appended, so file order is insertion order. A line
/// that does not parse is the remains of an interrupted append; it is
/// skipped with a warning rather than failing every later run.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw file, treating a missing file as empty history.
    async fn read(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(DdnsError::StoreRead(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Parse every intact observation, oldest first.
    fn parse(&self, content: &str) -> Vec<IpObservation> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(number, line)| match serde_json::from_str(line) {
                Ok(observation) => Some(observation),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = number + 1,
                        error = %e,
                        "Skipping unreadable history line"
                    );
                    None
                }
            })
            .collect()
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut buffer = Vec::with_capacity(line.len() + 2);
        if !ends_with_newline(&mut file).await? {
            buffer.push(b'\n');
        }
        buffer.extend_from_slice(line.as_bytes());
        buffer.push(b'\n');

        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_all().await
    }
}

/// Whether the file is empty or its last byte is a newline.
async fn ends_with_newline(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }

    file.seek(std::io::SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn latest(&self) -> Result<Option<IpObservation>> {
        let content = self.read().await?;
        Ok(self.parse(&content).pop())
    }

    async fn record(&self, ip: &str) -> Result<IpObservation> {
        let observation = IpObservation::now(ip);
        let line = serde_json::to_string(&observation)
            .map_err(|e| DdnsError::StoreWrite(e.to_string()))?;

        self.append(&line).await.map_err(|e| {
            DdnsError::StoreWrite(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::debug!(ip, path = %self.path.display(), "Recorded IP observation");
        Ok(observation)
    }

    async fn history(&self) -> Result<Vec<IpObservation>> {
        let content = self.read().await?;
        Ok(self.parse(&content))
    }
}
