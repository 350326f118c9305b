pub mod classify;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::error::{AppError, AppResult};
use crate::metadata::MetadataProvider;
use crate::protocol_client::{ProtocolClient, ProtocolClientCache};
use crate::store::media_items::NewMediaItem;
use crate::store::models::{MediaVariant, Source};
use crate::store::Store;

use classify::{
    find_episode_marker, is_tv_show_path, language_label, parse_episode_title, parse_movie_title,
    show_name_from_path, subtitle_suffix, SubtitleFormat,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanProgress {
    pub total_files: usize,
    pub scanned_files: usize,
    pub added_files: usize,
    pub metadata_fetched: usize,
    pub errors: Vec<String>,
    pub finished: bool,
}

/// At most one scan runs at a time per process, per spec.md §4.1/§5; a
/// second concurrent call is rejected, not queued.
pub struct Indexer {
    store: Store,
    protocol_clients: Arc<ProtocolClientCache>,
    video_extensions: Vec<String>,
    server_secret: String,
    busy: Mutex<Option<watch::Receiver<ScanProgress>>>,
    auto_enrich: bool,
    metadata_provider: Option<Arc<dyn MetadataProvider>>,
}

impl Indexer {
    pub fn new(
        store: Store,
        protocol_clients: Arc<ProtocolClientCache>,
        video_extensions: Vec<String>,
        server_secret: String,
        auto_enrich: bool,
        metadata_provider: Option<Arc<dyn MetadataProvider>>,
    ) -> Self {
        Self {
            store,
            protocol_clients,
            video_extensions,
            server_secret,
            busy: Mutex::new(None),
            auto_enrich,
            metadata_provider,
        }
    }

    pub async fn scan_progress(&self) -> Option<ScanProgress> {
        let guard = self.busy.lock().await;
        guard.as_ref().map(|rx| rx.borrow().clone())
    }

    pub async fn scan(self: &Arc<Self>, source: Source) -> AppResult<watch::Receiver<ScanProgress>> {
        let mut guard = self.busy.lock().await;
        if let Some(rx) = guard.as_ref() {
            if !rx.borrow().finished {
                return Err(AppError::ScanBusy);
            }
        }

        let (tx, rx) = watch::channel(ScanProgress::default());
        *guard = Some(rx.clone());
        drop(guard);

        let indexer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = indexer.run_scan(source, tx.clone()).await {
                tracing::error!(error = %e, "scan failed");
                tx.send_modify(|p| {
                    p.errors.push(e.to_string());
                    p.finished = true;
                });
            }
        });

        Ok(rx)
    }

    async fn run_scan(
        &self,
        source: Source,
        progress: watch::Sender<ScanProgress>,
    ) -> anyhow::Result<()> {
        let client = self
            .protocol_clients
            .get_or_connect(&source, &self.server_secret)
            .await?;

        let extensions = self.video_extensions.clone();
        let paths = list_video_paths(client.as_ref(), "", &extensions).await;

        progress.send_modify(|p| p.total_files = paths.len());

        for relative_path in paths {
            let result = self.index_one(&source, client.as_ref(), &relative_path).await;
            progress.send_modify(|p| {
                p.scanned_files += 1;
                match result {
                    Ok((added, enriched)) => {
                        if added {
                            p.added_files += 1;
                        }
                        if enriched {
                            p.metadata_fetched += 1;
                        }
                    }
                    Err(e) => p.errors.push(format!("{relative_path}: {e}")),
                }
            });
        }

        progress.send_modify(|p| p.finished = true);
        Ok(())
    }

    async fn index_one(
        &self,
        source: &Source,
        client: &dyn ProtocolClient,
        relative_path: &str,
    ) -> anyhow::Result<(bool, bool)> {
        let stat = client.stat(relative_path).await?;
        let file_size = stat.size.unwrap_or(0) as i64;
        let filename = relative_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(relative_path);

        let is_episode = is_tv_show_path(relative_path);
        let marker = if is_episode {
            find_episode_marker(filename)
        } else {
            None
        };

        let (media_item_id, added, enriched) = if let Some(marker) = marker {
            self.index_episode(source, relative_path, filename, file_size, marker)
                .await?
        } else {
            self.index_movie(source, relative_path, filename, file_size)
                .await?
        };

        if added {
            self.discover_subtitles(client, relative_path, filename, media_item_id)
                .await?;
        }

        Ok((added, enriched))
    }

    /// Dispatches an enrichment lookup when a provider is configured and
    /// `auto_enrich` is on, per spec.md §4.1 step 6. Lookup failures are
    /// swallowed — enrichment is best-effort, not load-bearing for the scan.
    async fn enrich_movie(&self, media_item_id: i64, title: &str, year: Option<i64>) -> bool {
        let Some(provider) = &self.metadata_provider else {
            return false;
        };
        if !self.auto_enrich {
            return false;
        }
        match provider.search_movie(title, year).await {
            Ok(Some(meta)) => {
                let genres = meta.genres.join(",");
                self.store
                    .touch_media_item_metadata(
                        media_item_id,
                        Some(&meta.external_id),
                        meta.overview.as_deref(),
                        meta.rating,
                        Some(&genres),
                        meta.poster_url.as_deref(),
                        meta.backdrop_url.as_deref(),
                    )
                    .await
                    .is_ok()
            }
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(title, error = %e, "movie metadata lookup failed");
                false
            }
        }
    }

    async fn enrich_tv_show(&self, tv_show_id: i64, show_media_item_id: i64, show_name: &str) -> bool {
        let Some(provider) = &self.metadata_provider else {
            return false;
        };
        if !self.auto_enrich {
            return false;
        }
        match provider.search_tv_show(show_name).await {
            Ok(Some(meta)) => {
                let genres = meta.genres.join(",");
                let tv_ok = self
                    .store
                    .touch_tv_show_metadata(
                        tv_show_id,
                        Some(&meta.external_id),
                        meta.overview.as_deref(),
                        None,
                        meta.status.as_deref(),
                        meta.poster_url.as_deref(),
                        meta.backdrop_url.as_deref(),
                        Some(&genres),
                    )
                    .await
                    .is_ok();
                let item_ok = self
                    .store
                    .touch_media_item_metadata(
                        show_media_item_id,
                        Some(&meta.external_id),
                        meta.overview.as_deref(),
                        None,
                        Some(&genres),
                        meta.poster_url.as_deref(),
                        meta.backdrop_url.as_deref(),
                    )
                    .await
                    .is_ok();
                tv_ok && item_ok
            }
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(show_name, error = %e, "tv show metadata lookup failed");
                false
            }
        }
    }

    async fn index_movie(
        &self,
        source: &Source,
        relative_path: &str,
        filename: &str,
        file_size: i64,
    ) -> anyhow::Result<(i64, bool, bool)> {
        let parsed = parse_movie_title(filename);
        let (id, added) = self
            .store
            .upsert_media_item(NewMediaItem {
                variant: MediaVariant::Movie,
                title: parsed.title.clone(),
                year: parsed.year,
                duration_secs: None,
                file_path: relative_path.to_string(),
                file_size,
                source_kind: source.protocol_kind,
                source_id: Some(source.id),
                quality_label: None,
            })
            .await?;

        let enriched = if added {
            self.enrich_movie(id, &parsed.title, parsed.year).await
        } else {
            false
        };

        Ok((id, added, enriched))
    }

    async fn index_episode(
        &self,
        source: &Source,
        relative_path: &str,
        filename: &str,
        file_size: i64,
        marker: classify::EpisodeMarker,
    ) -> anyhow::Result<(i64, bool, bool)> {
        let show_name = show_name_from_path(relative_path)
            .unwrap_or_else(|| "Unknown Show".to_string());
        let episode_title = parse_episode_title(filename, marker);

        let (media_item_id, added) = self
            .store
            .upsert_media_item(NewMediaItem {
                variant: MediaVariant::Episode,
                title: format!("{show_name} S{:02}E{:02}", marker.season, marker.episode),
                year: None,
                duration_secs: None,
                file_path: relative_path.to_string(),
                file_size,
                source_kind: source.protocol_kind,
                source_id: Some(source.id),
                quality_label: None,
            })
            .await?;

        let mut enriched = false;
        if added {
            // The paired TvShow needs its own MediaItem row for the
            // invariant in spec.md §3; find-or-create it from the show
            // name, reusing the same source.
            let (show_media_item_id, show_added) = self
                .store
                .upsert_media_item(NewMediaItem {
                    variant: MediaVariant::TvShow,
                    title: show_name.clone(),
                    year: None,
                    duration_secs: None,
                    file_path: format!("tv-shows/{show_name}"),
                    file_size: 0,
                    source_kind: source.protocol_kind,
                    source_id: Some(source.id),
                    quality_label: None,
                })
                .await?;

            let tv_show_id = self
                .store
                .upsert_tv_show(show_media_item_id, &show_name)
                .await?;

            self.store
                .upsert_episode(
                    tv_show_id,
                    marker.season as i64,
                    marker.episode as i64,
                    media_item_id,
                    Some(&episode_title),
                )
                .await?;

            self.store.recompute_tv_show_counts(tv_show_id).await?;

            if show_added {
                enriched = self.enrich_tv_show(tv_show_id, show_media_item_id, &show_name).await;
            }
        }

        Ok((media_item_id, added, enriched))
    }

    async fn discover_subtitles(
        &self,
        client: &dyn ProtocolClient,
        relative_path: &str,
        filename: &str,
        media_item_id: i64,
    ) -> anyhow::Result<()> {
        let dir = relative_path
            .rsplit_once(['/', '\\'])
            .map(|(dir, _)| dir)
            .unwrap_or("");
        let video_stem = match filename.rfind('.') {
            Some(idx) => &filename[..idx],
            None => filename,
        };

        let Ok(entries) = client.list(dir).await else {
            return Ok(());
        };

        let mut any_default = self.store.has_any_subtitle(media_item_id).await?;

        for entry in entries {
            if entry.is_dir {
                continue;
            }
            let Some((stem, ext)) = entry.name.rsplit_once('.') else {
                continue;
            };
            let Some(format) = SubtitleFormat::from_extension(ext) else {
                continue;
            };
            if !stem.starts_with(video_stem) || stem == video_stem {
                continue;
            }
            let Some(code) = subtitle_suffix(stem, video_stem) else {
                continue;
            };
            let label = language_label(code);
            let is_default = !any_default;
            self.store
                .insert_subtitle(
                    media_item_id,
                    &code.to_lowercase(),
                    &label,
                    &entry.path,
                    format.as_str(),
                    is_default,
                )
                .await?;
            any_default = true;
        }

        Ok(())
    }
}

/// Depth-first walk of a `ProtocolClient` tree collecting paths with a
/// video extension, per spec.md §4.1 step 1.
async fn list_video_paths(client: &dyn ProtocolClient, dir: &str, extensions: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let entries = match client.list(dir).await {
        Ok(entries) => entries,
        Err(_) => return out,
    };

    for entry in entries {
        if entry.is_dir {
            let nested = Box::pin(list_video_paths(client, &entry.path, extensions)).await;
            out.extend(nested);
        } else if has_video_extension(&entry.name, extensions) {
            out.push(entry.path);
        }
    }
    out
}

fn has_video_extension(name: &str, extensions: &[String]) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
