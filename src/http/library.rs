use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::store::models::{Episode, MediaItem, MediaVariant, TvShow};

use super::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movies", get(movies))
        .route("/tvshows", get(tv_shows))
        .route("/tvshow/{id}", get(tv_show))
        .route("/episode/{id}/next", get(next_episode))
        .route("/episode/{id}/previous", get(previous_episode))
        .route("/search", get(search))
        .route("/item/{id}", get(item))
        .route("/scan", post(scan))
        .route("/scan/progress", get(scan_progress))
}

#[derive(Serialize)]
struct MoviesResponse {
    count: usize,
    movies: Vec<MediaItem>,
}

async fn movies(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<MoviesResponse>> {
    let movies = state.store.list_movies().await?;
    Ok(Json(MoviesResponse {
        count: movies.len(),
        movies,
    }))
}

#[derive(Serialize)]
struct TvShowsResponse {
    count: usize,
    #[serde(rename = "tvShows")]
    tv_shows: Vec<MediaItem>,
}

async fn tv_shows(_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<TvShowsResponse>> {
    let tv_shows = state.store.list_tv_show_media_items().await?;
    Ok(Json(TvShowsResponse {
        count: tv_shows.len(),
        tv_shows,
    }))
}

#[derive(Serialize)]
struct Season {
    #[serde(rename = "seasonNumber")]
    season_number: i64,
    episodes: Vec<Episode>,
}

#[derive(Serialize)]
struct TvShowDetail {
    #[serde(flatten)]
    show: TvShow,
    seasons: Vec<Season>,
}

async fn tv_show(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<TvShowDetail>> {
    let show = state.store.get_tv_show(id).await?;
    let episodes = state.store.list_episodes_for_show(id).await?;

    let mut seasons: Vec<Season> = Vec::new();
    for episode in episodes {
        match seasons.last_mut() {
            Some(season) if season.season_number == episode.season_number => {
                season.episodes.push(episode);
            }
            _ => seasons.push(Season {
                season_number: episode.season_number,
                episodes: vec![episode],
            }),
        }
    }

    Ok(Json(TvShowDetail { show, seasons }))
}

async fn next_episode(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Episode>> {
    let current = state.store.get_episode(id).await?;
    state
        .store
        .next_episode(current.tv_show_id, current.season_number, current.episode_number)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn previous_episode(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Episode>> {
    let current = state.store.get_episode(id).await?;
    state
        .store
        .previous_episode(current.tv_show_id, current.season_number, current.episode_number)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    #[serde(rename = "type")]
    variant: Option<String>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<MediaItem>,
}

async fn search(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    let variant = match params.variant.as_deref() {
        Some("movie") => Some(MediaVariant::Movie),
        Some("tvshow") | Some("tv_show") => Some(MediaVariant::TvShow),
        Some("episode") => Some(MediaVariant::Episode),
        _ => None,
    };
    let results = state
        .store
        .search_media_items(&params.q, variant, params.limit.unwrap_or(50))
        .await?;
    Ok(Json(SearchResponse { results }))
}

async fn item(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MediaItem>> {
    Ok(Json(state.store.get_media_item(id).await?))
}

#[derive(Deserialize)]
struct ScanRequest {
    path: String,
}

#[derive(Serialize)]
struct ScanResponse {
    message: String,
    progress: crate::indexer::ScanProgress,
}

async fn scan(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ScanRequest>,
) -> AppResult<Json<ScanResponse>> {
    let source = state
        .store
        .list_sources()
        .await?
        .into_iter()
        .find(|s| s.base_path.as_deref() == Some(body.path.as_str()))
        .ok_or(AppError::NotFound)?;

    let mut progress_rx = state.indexer.scan(source).await?;
    progress_rx.changed().await.ok();
    let progress = progress_rx.borrow().clone();

    Ok(Json(ScanResponse {
        message: "scan started".into(),
        progress,
    }))
}

async fn scan_progress(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Json<Option<crate::indexer::ScanProgress>> {
    Json(state.indexer.scan_progress().await)
}
