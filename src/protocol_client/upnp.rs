use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::net::UdpSocket;

use crate::store::models::Source;

use super::{DiscoveredDevice, ProtocolClient, ProtocolError, RemoteEntry};

const SSDP_MULTICAST_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);
const MEDIA_SERVER_ST: &str = "urn:schemas-upnp-org:device:MediaServer:1";

/// Client-side SSDP, grounded on `upnp::search_client::SearchClient`'s
/// bind/send/recv idiom. That type is built around a single typed SOAP
/// service (`ScpdService`); generic device discovery needs the raw
/// multicast request/response pair instead, so it's reimplemented here
/// directly over a `UdpSocket` rather than forced through the typed API.
pub struct UpnpClient {
    location: Option<String>,
}

impl UpnpClient {
    pub fn new(source: &Source) -> Self {
        Self {
            location: source.host.clone(),
        }
    }

    /// Two passes per spec.md §4.2: a targeted media-server search, then a
    /// broad `ssdp:all`, aggregating unique responses by USN until the
    /// caller-supplied deadline.
    pub async fn discover(timeout: Duration) -> anyhow::Result<Vec<DiscoveredDevice>> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        let fetch_client = reqwest::Client::new();

        let mut devices: Vec<DiscoveredDevice> = Vec::new();
        let mut seen_usns = std::collections::HashSet::new();

        for search_target in [MEDIA_SERVER_ST, "ssdp:all"] {
            send_msearch(&socket, search_target).await?;
            let pass_deadline = tokio::time::Instant::now() + timeout;
            loop {
                let remaining = pass_deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    break;
                }
                let mut buf = [0u8; 2048];
                let Ok(Ok((read, _))) = tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await
                else {
                    break;
                };
                let Ok(text) = std::str::from_utf8(&buf[..read]) else {
                    continue;
                };
                let Some((usn, location)) = parse_msearch_response(text) else {
                    continue;
                };
                if !seen_usns.insert(usn.clone()) {
                    continue;
                }
                if let Ok(device) = fetch_device_info(&fetch_client, &location, &usn).await {
                    devices.push(device);
                }
            }
        }

        Ok(devices)
    }
}

async fn send_msearch(socket: &UdpSocket, search_target: &str) -> anyhow::Result<()> {
    let message = format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 2\r\n\
         ST: {search_target}\r\n\r\n"
    );
    socket
        .send_to(message.as_bytes(), SocketAddr::V4(SSDP_MULTICAST_ADDR))
        .await?;
    Ok(())
}

fn parse_msearch_response(text: &str) -> Option<(String, String)> {
    let mut usn = None;
    let mut location = None;
    for line in text.lines() {
        // LOCATION/USN values can themselves contain colons (http URLs), so
        // split only on the first one.
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        match name.trim().to_ascii_uppercase().as_str() {
            "USN" => usn = Some(value.trim().to_string()),
            "LOCATION" => location = Some(value.trim().to_string()),
            _ => {}
        }
    }
    match (usn, location) {
        (Some(usn), Some(location)) => Some((usn, location)),
        _ => None,
    }
}

async fn fetch_device_info(
    client: &reqwest::Client,
    location: &str,
    usn: &str,
) -> anyhow::Result<DiscoveredDevice> {
    let body = client.get(location).send().await?.text().await?;
    Ok(DiscoveredDevice {
        friendly_name: extract_tag(&body, "friendlyName").unwrap_or_else(|| "Unknown device".into()),
        manufacturer: extract_tag(&body, "manufacturer"),
        model: extract_tag(&body, "modelName"),
        location: location.to_string(),
        usn: usn.to_string(),
    })
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].trim().to_string())
}

#[async_trait]
impl ProtocolClient for UpnpClient {
    async fn connect(&self) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn list(&self, _path: &str) -> Result<Vec<RemoteEntry>, ProtocolError> {
        Err(ProtocolError::NotConnected)
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry, ProtocolError> {
        Err(ProtocolError::NotFound(path.to_string()))
    }

    async fn open_range(
        &self,
        _path: &str,
        _start: u64,
        _end: Option<u64>,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, ProtocolError> {
        Err(ProtocolError::Transient(
            "upnp sources do not implement byte-range reads".to_string(),
        ))
    }

    async fn test_connection(&self) -> (bool, String) {
        match &self.location {
            Some(location) => match reqwest::get(location).await {
                Ok(resp) if resp.status().is_success() => (true, "ok".to_string()),
                Ok(resp) => (false, resp.status().to_string()),
                Err(e) => (false, e.to_string()),
            },
            None => (false, "no device location configured".to_string()),
        }
    }

    /// UPnP advertises the unsupported byte-range capability explicitly
    /// rather than failing silently, per spec.md §9.
    fn supports_byte_range(&self) -> bool {
        false
    }
}
