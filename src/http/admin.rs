use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::store::models::{Source, User};

use super::AdminUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/sources", get(list_sources))
        .route("/media/{id}", delete(delete_media_item))
        .route("/stats", get(dashboard_stats))
        .route("/cache", get(cache_stats))
        .route("/cache/{media_id}", delete(clear_cache_for_media))
}

#[derive(Serialize)]
struct UsersResponse {
    users: Vec<User>,
}

async fn list_users(_admin: AdminUser, State(state): State<AppState>) -> AppResult<Json<UsersResponse>> {
    let users = state.store.list_users().await?;
    Ok(Json(UsersResponse { users }))
}

async fn delete_user(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if admin.0.id == id {
        return Err(AppError::InvalidInput("cannot delete your own account".into()));
    }
    state.store.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<Source>,
}

async fn list_sources(_admin: AdminUser, State(state): State<AppState>) -> AppResult<Json<SourcesResponse>> {
    let sources = state.store.list_sources().await?;
    Ok(Json(SourcesResponse { sources }))
}

async fn delete_media_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.cache_mgr.clear_media(id).await.map_err(AppError::from)?;
    state.store.delete_media_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct DashboardStats {
    #[serde(rename = "userCount")]
    user_count: i64,
    #[serde(rename = "mediaItemCount")]
    media_item_count: i64,
    #[serde(rename = "sourceCount")]
    source_count: usize,
}

async fn dashboard_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardStats>> {
    let user_count = state.store.count_users().await?;
    let media_item_count = state.store.count_media_items().await?;
    let source_count = state.store.list_sources().await?.len();
    Ok(Json(DashboardStats {
        user_count,
        media_item_count,
        source_count,
    }))
}

async fn cache_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<crate::cache_mgr::CacheTotals> {
    Json(state.cache_mgr.totals())
}

async fn clear_cache_for_media(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(media_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.cache_mgr.clear_media(media_id).await.map_err(AppError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
