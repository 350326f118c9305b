use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::headers::Range;
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::probe::{self, ProbeResult};
use crate::store::models::{MediaItem, ProtocolKind};
use crate::streamer::{self, RangeDecision};
use crate::transcoder::command;

use super::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/info", get(info))
        .route("/{id}/qualities", get(qualities))
        .route("/{id}/direct", get(direct))
        .route("/{id}/transcode", get(transcode))
        .route("/{id}/pretranscode", post(pretranscode))
        .route("/{id}/hls/manifest.m3u8", get(hls_manifest))
        .route("/{id}/hls/{segment}", get(hls_segment))
}

/// Drops a guard token when the response body stream is dropped — wires the
/// realtime transcode's lifetime to the HTTP connection, per spec.md §5 and
/// §9 "client-disconnect-driven cancellation".
struct CancelOnDrop<S> {
    inner: S,
    cancel: CancellationToken,
}

impl<S: Stream + Unpin> Stream for CancelOnDrop<S> {
    type Item = S::Item;
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for CancelOnDrop<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Realtime transcoding and probing require a real filesystem path; only
/// `Local` sources qualify. Remote protocols (FTP/SMB/UPnP) still get
/// range-mode direct serving through `ProtocolClient`, just not transcoding.
async fn resolve_local_input(state: &AppState, media: &MediaItem) -> AppResult<PathBuf> {
    if media.source_kind != ProtocolKind::Local {
        return Err(AppError::Upstream(
            "transcoding is only supported for local sources".into(),
        ));
    }
    let source_id = media
        .source_id
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("local media item missing source_id")))?;
    let source = state.store.get_source(source_id).await?;
    let base = source.base_path.unwrap_or_default();
    Ok(Path::new(&base).join(media.file_path.trim_start_matches('/')))
}

async fn probe_media(state: &AppState, media: &MediaItem) -> AppResult<ProbeResult> {
    let path = resolve_local_input(state, media).await?;
    probe::probe(&state.config.ffprobe_path, &path).await
}

async fn info(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> AppResult<Json<ProbeResult>> {
    let media = state.store.get_media_item(id).await?;
    Ok(Json(probe_media(&state, &media).await?))
}

#[derive(Serialize)]
struct QualitiesResponse {
    ladder: Vec<LadderEntry>,
}

#[derive(Serialize)]
struct LadderEntry {
    label: &'static str,
    height: u32,
    #[serde(rename = "videoBitrateKbps")]
    video_bitrate_kbps: u32,
}

async fn qualities(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> AppResult<Json<QualitiesResponse>> {
    let media = state.store.get_media_item(id).await?;
    let probe = probe_media(&state, &media).await?;
    let height = probe.video.map(|v| v.height).unwrap_or(0);
    let ladder = probe::ladder_for_height(height)
        .into_iter()
        .map(|rung| LadderEntry {
            label: rung.label,
            height: rung.height,
            video_bitrate_kbps: rung.video_bitrate_kbps,
        })
        .collect();
    Ok(Json(QualitiesResponse { ladder }))
}

async fn direct(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    range: Option<TypedHeader<Range>>,
) -> AppResult<Response> {
    let media = state.store.get_media_item(id).await?;

    let source = match media.source_id {
        Some(source_id) => Some(state.store.get_source(source_id).await?),
        None => None,
    };

    let client = match &source {
        Some(source) => {
            state
                .protocol_clients
                .get_or_connect(source, &state.config.server_secret)
                .await
                .map_err(|e| AppError::Upstream(e.to_string()))?
        }
        None => return Err(AppError::NotFound),
    };

    let stat = client
        .stat(&media.file_path)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let file_size = stat.size.unwrap_or(media.file_size.max(0) as u64);

    if streamer::is_web_native(&media.file_path) {
        let ext = streamer::extension_of(&media.file_path);
        let content_type = streamer::mime_for_extension(ext);
        let range_value = range.map(|TypedHeader(r)| r);

        match streamer::decide_range(range_value.as_ref(), file_size) {
            RangeDecision::Unsatisfiable => Ok((
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
            )
                .into_response()),
            RangeDecision::Full => {
                let reader = client
                    .open_range(&media.file_path, 0, None)
                    .await
                    .map_err(|e| AppError::Upstream(e.to_string()))?;
                let body = Body::from_stream(ReaderStream::new(reader));
                Ok((
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, content_type.to_string()),
                        (header::CONTENT_LENGTH, file_size.to_string()),
                        (header::ACCEPT_RANGES, "bytes".to_string()),
                    ],
                    body,
                )
                    .into_response())
            }
            RangeDecision::Partial { start, end } => {
                let reader = client
                    .open_range(&media.file_path, start, Some(end))
                    .await
                    .map_err(|e| AppError::Upstream(e.to_string()))?;
                let content_length = end - start + 1;
                let body = Body::from_stream(ReaderStream::new(reader));
                Ok((
                    StatusCode::PARTIAL_CONTENT,
                    [
                        (header::CONTENT_TYPE, content_type.to_string()),
                        (
                            header::CONTENT_RANGE,
                            format!("bytes {start}-{end}/{file_size}"),
                        ),
                        (header::CONTENT_LENGTH, content_length.to_string()),
                        (header::ACCEPT_RANGES, "bytes".to_string()),
                    ],
                    body,
                )
                    .into_response())
            }
        }
    } else {
        // Transparent transcode: Matroska and similar containers cannot be
        // range-served, so the Streamer falls back to a realtime fragmented
        // MP4 piped straight to the response body (spec.md §4.6).
        let input = resolve_local_input(&state, &media).await?;
        let probe = probe::probe(&state.config.ffprobe_path, &input).await?;
        let height = probe.video.map(|v| v.height).unwrap_or(1080);
        let profile = streamer::default_hls_profile(height);

        let cancel = CancellationToken::new();
        let rx = state
            .transcoder
            .stream_transcode(&input, profile, cancel.clone())
            .await?;
        let body_stream = CancelOnDrop {
            inner: ReceiverStream::new(rx),
            cancel,
        };
        let body = Body::from_stream(body_stream);

        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (header::TRANSFER_ENCODING, "chunked".to_string()),
            ],
            body,
        )
            .into_response())
    }
}

#[derive(Deserialize)]
struct QualityParam {
    quality: String,
}

async fn transcode(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Query(params): Query<QualityParam>,
) -> AppResult<Response> {
    let media = state.store.get_media_item(id).await?;
    let profile = command::profile_by_label(&params.quality)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown quality {}", params.quality)))?;
    let input = resolve_local_input(&state, &media).await?;

    let cancel = CancellationToken::new();
    let rx = state
        .transcoder
        .stream_transcode(&input, profile, cancel.clone())
        .await?;
    let body_stream = CancelOnDrop {
        inner: ReceiverStream::new(rx),
        cancel,
    };
    let body = Body::from_stream(body_stream);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::TRANSFER_ENCODING, "chunked".to_string()),
        ],
        body,
    )
        .into_response())
}

#[derive(Deserialize)]
struct PretranscodeRequest {
    quality: String,
}

#[derive(Serialize)]
struct PretranscodeResponse {
    message: String,
}

async fn pretranscode(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(body): Json<PretranscodeRequest>,
) -> AppResult<Json<PretranscodeResponse>> {
    let media = state.store.get_media_item(id).await?;
    let profile = command::profile_by_label(&body.quality)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown quality {}", body.quality)))?;
    let input = resolve_local_input(&state, &media).await?;

    let transcoder = state.transcoder.clone();
    tokio::spawn(async move {
        if let Err(e) = transcoder.transcode_quality(&input, id, profile).await {
            tracing::warn!(media_id = id, error = %e, "pretranscode failed");
        }
    });

    Ok(Json(PretranscodeResponse {
        message: "pretranscode started".into(),
    }))
}

async fn hls_manifest(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> AppResult<Response> {
    let media = state.store.get_media_item(id).await?;
    let input = resolve_local_input(&state, &media).await?;
    let probe = probe::probe(&state.config.ffprobe_path, &input).await?;
    let height = probe.video.map(|v| v.height).unwrap_or(1080);
    let profile = streamer::default_hls_profile(height);

    let manifest_path = state.cache_mgr.hls_variant_dir(id, profile.label).join("playlist.m3u8");
    if tokio::fs::metadata(&manifest_path).await.is_ok() {
        state.cache_mgr.touch(&manifest_path).await;
        let body = tokio::fs::read(&manifest_path).await.map_err(AppError::from)?;
        return Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
            body,
        )
            .into_response());
    }

    let transcoder = state.transcoder.clone();
    tokio::spawn(async move {
        if let Err(e) = transcoder.generate_hls(&input, id, profile).await {
            tracing::warn!(media_id = id, error = %e, "hls generation failed");
        }
    });

    Ok(StatusCode::ACCEPTED.into_response())
}

async fn hls_segment(
    _user: AuthUser,
    State(state): State<AppState>,
    AxumPath((id, segment)): AxumPath<(i64, String)>,
) -> AppResult<Response> {
    let media = state.store.get_media_item(id).await?;
    let input = resolve_local_input(&state, &media).await?;
    let probe = probe::probe(&state.config.ffprobe_path, &input).await?;
    let height = probe.video.map(|v| v.height).unwrap_or(1080);
    let profile = streamer::default_hls_profile(height);

    let segment_path = state.cache_mgr.hls_variant_dir(id, profile.label).join(&segment);
    if !segment_path.starts_with(state.cache_mgr.root()) {
        return Err(AppError::InvalidInput("invalid segment path".into()));
    }

    match tokio::fs::read(&segment_path).await {
        Ok(bytes) => {
            state.cache_mgr.touch(&segment_path).await;
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, "video/mp2t")], bytes).into_response())
        }
        Err(_) => Err(AppError::NotFound),
    }
}
