use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeekExt};

use super::{ProtocolClient, ProtocolError, RemoteEntry};

/// Wraps `tokio::fs`. Connection lifecycle is a no-op since there is no
/// session to establish, matching the teacher's treatment of local paths
/// in `source.rs`/`library/mod.rs`.
#[derive(Debug, Clone)]
pub struct LocalClient {
    base_path: PathBuf,
}

impl LocalClient {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(relative)
        }
    }
}

#[async_trait]
impl ProtocolClient for LocalClient {
    async fn connect(&self) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, ProtocolError> {
        let dir = self.resolve(path);
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_to_protocol_error(&dir, e))?;

        let relative_dir = path.trim_matches('/');
        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| ProtocolError::Transient(e.to_string()))?
        {
            let metadata = entry.metadata().await.ok();
            let name = entry.file_name().to_string_lossy().to_string();
            let relative_path = if relative_dir.is_empty() {
                name.clone()
            } else {
                format!("{relative_dir}/{name}")
            };
            entries.push(RemoteEntry {
                name,
                path: relative_path,
                is_dir: metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false),
                size: metadata.as_ref().map(|m| m.len()),
                mtime: metadata
                    .as_ref()
                    .and_then(|m| m.modified().ok())
                    .map(time::OffsetDateTime::from),
            });
        }
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry, ProtocolError> {
        let full = self.resolve(path);
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| io_to_protocol_error(&full, e))?;
        Ok(RemoteEntry {
            name: full
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.trim_matches('/').to_string(),
            is_dir: metadata.is_dir(),
            size: Some(metadata.len()),
            mtime: metadata
                .modified()
                .ok()
                .map(time::OffsetDateTime::from),
        })
    }

    async fn open_range(
        &self,
        path: &str,
        start: u64,
        _end: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ProtocolError> {
        let full = self.resolve(path);
        let mut file = tokio::fs::File::open(&full)
            .await
            .map_err(|e| io_to_protocol_error(&full, e))?;
        if start > 0 {
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|e| ProtocolError::Transient(e.to_string()))?;
        }
        Ok(Box::new(file))
    }

    async fn test_connection(&self) -> (bool, String) {
        match tokio::fs::metadata(&self.base_path).await {
            Ok(meta) if meta.is_dir() => (true, "ok".to_string()),
            Ok(_) => (false, "base path is not a directory".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }
}

fn io_to_protocol_error(path: &Path, error: std::io::Error) -> ProtocolError {
    match error.kind() {
        std::io::ErrorKind::NotFound => ProtocolError::NotFound(path.to_string_lossy().to_string()),
        _ => ProtocolError::Transient(error.to_string()),
    }
}
