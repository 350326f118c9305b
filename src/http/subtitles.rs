use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::protocol_client::read_all;
use crate::store::models::Subtitle;

use super::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/media/{id}", get(list_for_media))
        .route("/{id}", get(serve))
}

#[derive(Serialize)]
struct SubtitleListResponse {
    subtitles: Vec<Subtitle>,
}

async fn list_for_media(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(media_item_id): Path<i64>,
) -> AppResult<Json<SubtitleListResponse>> {
    let subtitles = state.store.list_subtitles_for_media(media_item_id).await?;
    Ok(Json(SubtitleListResponse { subtitles }))
}

fn mime_for_format(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "srt" => "application/x-subrip",
        "vtt" => "text/vtt",
        "ass" | "ssa" => "text/x-ssa",
        _ => "text/plain",
    }
}

async fn serve(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let subtitle = state.store.get_subtitle(id).await?;
    let media = state.store.get_media_item(subtitle.media_item_id).await?;
    let source_id = media.source_id.ok_or(AppError::NotFound)?;
    let source = state.store.get_source(source_id).await?;

    let client = state
        .protocol_clients
        .get_or_connect(&source, &state.config.server_secret)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let reader = client
        .open_range(&subtitle.file_path, 0, None)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let bytes = read_all(reader).await.map_err(AppError::from)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime_for_format(&subtitle.format))],
        bytes,
    )
        .into_response())
}
