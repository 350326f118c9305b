use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::store::models::{ProtocolKind, Source};

pub mod credentials;
pub mod ftp;
pub mod local;
pub mod smb;
pub mod upnp;

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("not connected")]
    NotConnected,
    #[error("authentication failed")]
    AuthFailed,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient failure: {0}")]
    Transient(String),
}

#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub mtime: Option<time::OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub friendly_name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub location: String,
    pub usn: String,
}

/// Shared surface every protocol implements, per spec.md §4.2. UPnP does not
/// implement `open_range` and reports that through `supports_byte_range`
/// instead of failing silently.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn connect(&self) -> Result<(), ProtocolError>;
    async fn disconnect(&self) -> Result<(), ProtocolError>;
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, ProtocolError>;
    async fn stat(&self, path: &str) -> Result<RemoteEntry, ProtocolError>;
    async fn open_range(
        &self,
        path: &str,
        start: u64,
        end: Option<u64>,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>, ProtocolError>;
    async fn test_connection(&self) -> (bool, String);
    fn supports_byte_range(&self) -> bool {
        true
    }
}

type CacheKey = (ProtocolKind, i64);

/// Lazily-connected, cached-per-source client pool. Entries are evicted on
/// source update/delete per spec.md §4.2; eviction waits for the held
/// `Arc` to drain naturally since callers hold it for the duration of an op.
#[derive(Default)]
pub struct ProtocolClientCache {
    clients: Mutex<HashMap<CacheKey, Arc<dyn ProtocolClient>>>,
}

impl ProtocolClientCache {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_connect(
        &self,
        source: &Source,
        server_secret: &str,
    ) -> anyhow::Result<Arc<dyn ProtocolClient>> {
        let key = (source.protocol_kind, source.id);
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_client(source, server_secret)?;
        client.connect().await?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    pub async fn evict(&self, protocol_kind: ProtocolKind, source_id: i64) {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.remove(&(protocol_kind, source_id)) {
            let _ = client.disconnect().await;
        }
    }
}

fn build_client(source: &Source, server_secret: &str) -> anyhow::Result<Arc<dyn ProtocolClient>> {
    match source.protocol_kind {
        ProtocolKind::Local => Ok(Arc::new(local::LocalClient::new(
            source.base_path.clone().unwrap_or_default(),
        ))),
        ProtocolKind::Ftp => Ok(Arc::new(ftp::FtpClient::new(source, server_secret)?)),
        ProtocolKind::Smb => Ok(Arc::new(smb::SmbClient::new(source, server_secret)?)),
        ProtocolKind::Upnp => Ok(Arc::new(upnp::UpnpClient::new(source))),
    }
}

pub async fn read_all(
    mut reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
) -> std::io::Result<Bytes> {
    use tokio::io::AsyncReadExt;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}
