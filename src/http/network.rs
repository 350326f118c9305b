use std::str::FromStr;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::protocol_client::credentials;
use crate::protocol_client::upnp::UpnpClient;
use crate::protocol_client::{DiscoveredDevice, RemoteEntry};
use crate::store::models::{ProtocolKind, Source};
use crate::store::sources::NewSource;

use super::{AdminUser, AuthUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sources", get(list_sources).post(create_source))
        .route("/sources/{id}", put(update_source).delete(delete_source))
        .route("/sources/{id}/test", post(test_source))
        .route("/sources/{id}/browse", get(browse_source))
        .route("/discover", post(discover))
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<Source>,
}

async fn list_sources(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<SourcesResponse>> {
    let sources = state.store.list_sources().await?;
    Ok(Json(SourcesResponse { sources }))
}

#[derive(Deserialize)]
struct CreateSourceRequest {
    display_name: String,
    protocol_kind: String,
    host: Option<String>,
    port: Option<i64>,
    username: Option<String>,
    password: Option<String>,
    base_path: Option<String>,
    domain: Option<String>,
}

async fn create_source(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(body): Json<CreateSourceRequest>,
) -> AppResult<(StatusCode, Json<Source>)> {
    let protocol_kind = ProtocolKind::from_str(&body.protocol_kind)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let encrypted_credential = match body.password.as_deref() {
        Some(password) if !password.is_empty() => Some(
            credentials::encrypt(&state.config.server_secret, password)
                .map_err(AppError::Internal)?,
        ),
        _ => None,
    };

    let source = state
        .store
        .create_source(NewSource {
            display_name: body.display_name,
            protocol_kind,
            host: body.host,
            port: body.port,
            username: body.username,
            encrypted_credential,
            base_path: body.base_path,
            domain: body.domain,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(source)))
}

#[derive(Deserialize)]
struct UpdateSourceRequest {
    enabled: bool,
}

async fn update_source(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSourceRequest>,
) -> AppResult<Json<Source>> {
    state.store.update_source_enabled(id, body.enabled).await?;
    if !body.enabled {
        let source = state.store.get_source(id).await?;
        state.protocol_clients.evict(source.protocol_kind, id).await;
    }
    Ok(Json(state.store.get_source(id).await?))
}

async fn delete_source(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let in_use = state.store.media_item_count_for_source(id).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "{in_use} media items still reference this source"
        )));
    }
    let source = state.store.get_source(id).await?;
    state.protocol_clients.evict(source.protocol_kind, id).await;
    state.store.delete_source(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct TestConnectionResponse {
    ok: bool,
    message: String,
}

async fn test_source(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<TestConnectionResponse>> {
    let source = state.store.get_source(id).await?;
    let client = state
        .protocol_clients
        .get_or_connect(&source, &state.config.server_secret)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let (ok, message) = client.test_connection().await;
    Ok(Json(TestConnectionResponse { ok, message }))
}

#[derive(Deserialize)]
struct BrowseParams {
    #[serde(default)]
    path: String,
}

#[derive(Serialize)]
struct BrowseResponse {
    entries: Vec<RemoteEntryDto>,
}

#[derive(Serialize)]
struct RemoteEntryDto {
    name: String,
    path: String,
    #[serde(rename = "isDir")]
    is_dir: bool,
    size: Option<u64>,
    mtime: Option<i64>,
}

impl From<RemoteEntry> for RemoteEntryDto {
    fn from(e: RemoteEntry) -> Self {
        Self {
            name: e.name,
            path: e.path,
            is_dir: e.is_dir,
            size: e.size,
            mtime: e.mtime.map(|t| t.unix_timestamp()),
        }
    }
}

async fn browse_source(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<BrowseParams>,
) -> AppResult<Json<BrowseResponse>> {
    let source = state.store.get_source(id).await?;
    let client = state
        .protocol_clients
        .get_or_connect(&source, &state.config.server_secret)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let entries = client
        .list(&params.path)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?
        .into_iter()
        .map(RemoteEntryDto::from)
        .collect();
    Ok(Json(BrowseResponse { entries }))
}

#[derive(Deserialize)]
struct DiscoverParams {
    #[serde(default = "default_discover_timeout_secs")]
    timeout: u64,
}

fn default_discover_timeout_secs() -> u64 {
    3
}

#[derive(Serialize)]
struct DiscoverResponse {
    devices: Vec<DiscoveredDeviceDto>,
}

#[derive(Serialize)]
struct DiscoveredDeviceDto {
    #[serde(rename = "friendlyName")]
    friendly_name: String,
    manufacturer: Option<String>,
    model: Option<String>,
    location: String,
    usn: String,
}

impl From<DiscoveredDevice> for DiscoveredDeviceDto {
    fn from(d: DiscoveredDevice) -> Self {
        Self {
            friendly_name: d.friendly_name,
            manufacturer: d.manufacturer,
            model: d.model,
            location: d.location,
            usn: d.usn,
        }
    }
}

async fn discover(
    _user: AuthUser,
    Query(params): Query<DiscoverParams>,
) -> AppResult<Json<DiscoverResponse>> {
    let devices = UpnpClient::discover(Duration::from_secs(params.timeout))
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(DiscoverResponse {
        devices: devices.into_iter().map(DiscoveredDeviceDto::from).collect(),
    }))
}
