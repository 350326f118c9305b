use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::store::models::WatchRecord;

use super::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress", post(update_progress))
        .route("/progress/{id}", get(get_progress))
        .route("/mark-watched/{id}", post(mark_watched))
        .route("/mark-unwatched/{id}", axum::routing::delete(mark_unwatched))
        .route("/continue-watching", get(continue_watching))
        .route("/recently-watched", get(recently_watched))
        .route("/history", get(history))
        .route("/stats", get(stats))
        .route("/reset/{id}", post(reset))
}

#[derive(Deserialize)]
struct ProgressRequest {
    #[serde(rename = "mediaItemId")]
    media_item_id: i64,
    #[serde(rename = "currentTime")]
    current_time: f64,
    duration: f64,
}

async fn update_progress(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ProgressRequest>,
) -> AppResult<Json<WatchRecord>> {
    let lock = state.watch_locks.lock_for(user.id, body.media_item_id).await;
    let _guard = lock.lock().await;

    let record = state
        .store
        .upsert_watch_progress(user.id, body.media_item_id, body.current_time, body.duration)
        .await?;
    Ok(Json(record))
}

async fn get_progress(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(media_item_id): Path<i64>,
) -> AppResult<Json<Option<WatchRecord>>> {
    let record = state.store.get_watch_record(user.id, media_item_id).await?;
    Ok(Json(record))
}

async fn mark_watched(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(media_item_id): Path<i64>,
) -> AppResult<Json<WatchRecord>> {
    let media = state.store.get_media_item(media_item_id).await?;
    let duration = media.duration_secs.unwrap_or(0.0);

    let lock = state.watch_locks.lock_for(user.id, media_item_id).await;
    let _guard = lock.lock().await;
    let record = state.store.mark_watched(user.id, media_item_id, duration).await?;
    Ok(Json(record))
}

async fn mark_unwatched(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(media_item_id): Path<i64>,
) -> AppResult<StatusCode> {
    let lock = state.watch_locks.lock_for(user.id, media_item_id).await;
    let _guard = lock.lock().await;
    state.store.mark_unwatched(user.id, media_item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Serialize)]
struct RecordsResponse {
    records: Vec<WatchRecord>,
}

async fn continue_watching(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecordsResponse>> {
    let records = state.store.continue_watching(user.id, params.limit).await?;
    Ok(Json(RecordsResponse { records }))
}

async fn recently_watched(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecordsResponse>> {
    let records = state.store.recently_watched(user.id, params.limit).await?;
    Ok(Json(RecordsResponse { records }))
}

#[derive(Deserialize)]
struct HistoryParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

async fn history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<RecordsResponse>> {
    let records = state.store.watch_history(user.id, params.limit, params.offset).await?;
    Ok(Json(RecordsResponse { records }))
}

#[derive(Serialize)]
struct StatsResponse {
    #[serde(rename = "itemsWatched")]
    items_watched: i64,
    #[serde(rename = "totalSecondsWatched")]
    total_seconds_watched: f64,
    #[serde(rename = "itemsCompleted")]
    items_completed: i64,
}

async fn stats(AuthUser(user): AuthUser, State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let (items_watched, total_seconds_watched, items_completed) = state.store.watch_stats(user.id).await?;
    Ok(Json(StatsResponse {
        items_watched,
        total_seconds_watched,
        items_completed,
    }))
}

async fn reset(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(media_item_id): Path<i64>,
) -> AppResult<StatusCode> {
    let lock = state.watch_locks.lock_for(user.id, media_item_id).await;
    let _guard = lock.lock().await;
    state.store.reset_watch_progress(user.id, media_item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
