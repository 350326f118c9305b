use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::Mutex;

/// Tracks the cache root described in spec.md §4.5: flat `<id>_<label>.mp4`
/// files and `hls_<id>/` trees. In-flight paths are marked before the
/// encoder writes and unmarked on completion/cancellation so sweeps never
/// remove a file currently being written.
pub struct CacheMgr {
    root: PathBuf,
    size_cap_bytes: u64,
    ttl: Duration,
    in_flight: Mutex<HashSet<PathBuf>>,
    totals: StdMutex<CacheTotals>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheTotals {
    pub total_bytes: u64,
    pub file_count: u64,
}

impl CacheMgr {
    pub fn new(root: PathBuf, size_cap_bytes: u64, ttl: Duration) -> Self {
        Self {
            root,
            size_cap_bytes,
            ttl,
            in_flight: Mutex::new(HashSet::new()),
            totals: StdMutex::new(CacheTotals::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mp4_path(&self, media_id: i64, label: &str) -> PathBuf {
        self.root.join(format!("{media_id}_{label}.mp4"))
    }

    pub fn hls_dir(&self, media_id: i64) -> PathBuf {
        self.root.join(format!("hls_{media_id}"))
    }

    pub fn hls_variant_dir(&self, media_id: i64, label: &str) -> PathBuf {
        self.hls_dir(media_id).join(label)
    }

    pub async fn mark_in_flight(&self, path: PathBuf) {
        self.in_flight.lock().await.insert(path);
    }

    pub async fn unmark_in_flight(&self, path: &Path) {
        self.in_flight.lock().await.remove(path);
    }

    async fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.lock().await.contains(path)
    }

    /// Bumps mtime so the artifact isn't evicted by the next LRU sweep.
    pub async fn touch(&self, path: &Path) {
        if let Ok(file) = tokio::fs::File::open(path).await {
            let now = std::time::SystemTime::now();
            let _ = file.set_modified(now).await;
        }
    }

    pub fn totals(&self) -> CacheTotals {
        *self.totals.lock().unwrap()
    }

    /// Removes the HLS tree and every `<id>_*.mp4` for a media item.
    pub async fn clear_media(&self, media_id: i64) -> std::io::Result<()> {
        let hls_dir = self.hls_dir(media_id);
        if tokio::fs::metadata(&hls_dir).await.is_ok() {
            tokio::fs::remove_dir_all(&hls_dir).await?;
        }

        let prefix = format!("{media_id}_");
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(&prefix)
            {
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
        Ok(())
    }

    /// TTL sweep (remove files older than `ttl`) followed by size-cap LRU
    /// eviction (oldest mtime first), per spec.md §4.5. In-flight paths are
    /// never removed by either pass.
    pub async fn run_maintenance(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let mut artifacts = self.collect_artifacts().await?;

        let now = std::time::SystemTime::now();
        let mut kept = Vec::new();
        for artifact in artifacts.drain(..) {
            if self.is_in_flight(&artifact.path).await {
                kept.push(artifact);
                continue;
            }
            let age = now
                .duration_since(artifact.mtime)
                .unwrap_or(Duration::ZERO);
            if age > self.ttl {
                remove_artifact(&artifact.path).await;
            } else {
                kept.push(artifact);
            }
        }

        kept.sort_by_key(|a| a.mtime);
        let mut total: u64 = kept.iter().map(|a| a.size).sum();
        let mut idx = 0;
        while total > self.size_cap_bytes && idx < kept.len() {
            let artifact = &kept[idx];
            if !self.is_in_flight(&artifact.path).await {
                total = total.saturating_sub(artifact.size);
                remove_artifact(&artifact.path).await;
            }
            idx += 1;
        }

        self.remove_empty_hls_dirs().await?;
        self.recompute_totals().await?;
        Ok(())
    }

    async fn remove_empty_hls_dirs(&self) -> std::io::Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(_) => return Ok(()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                let mut inner = tokio::fs::read_dir(entry.path()).await?;
                if inner.next_entry().await?.is_none() {
                    let _ = tokio::fs::remove_dir(entry.path()).await;
                }
            }
        }
        Ok(())
    }

    async fn collect_artifacts(&self) -> std::io::Result<Vec<Artifact>> {
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(_) => return Ok(out),
        };
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                out.push(Artifact {
                    path: entry.path(),
                    size: metadata.len(),
                    mtime: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
                });
            } else if metadata.is_dir() {
                collect_dir_recursive(&entry.path(), &mut out).await?;
            }
        }
        Ok(out)
    }

    async fn recompute_totals(&self) -> std::io::Result<()> {
        let artifacts = self.collect_artifacts().await?;
        let total_bytes = artifacts.iter().map(|a| a.size).sum();
        let file_count = artifacts.len() as u64;
        *self.totals.lock().unwrap() = CacheTotals {
            total_bytes,
            file_count,
        };
        Ok(())
    }
}

struct Artifact {
    path: PathBuf,
    size: u64,
    mtime: std::time::SystemTime,
}

fn collect_dir_recursive<'a>(
    dir: &'a Path,
    out: &'a mut Vec<Artifact>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                out.push(Artifact {
                    path: entry.path(),
                    size: metadata.len(),
                    mtime: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
                });
            } else if metadata.is_dir() {
                collect_dir_recursive(&entry.path(), out).await?;
            }
        }
        Ok(())
    })
}

async fn remove_artifact(path: &Path) {
    if tokio::fs::remove_file(path).await.is_err() {
        let _ = tokio::fs::remove_dir_all(path).await;
    }
}

/// Spawns the periodic sweep task, matching the teacher's pattern of wiring
/// background timers in `main.rs` rather than inside the component itself.
pub fn spawn_maintenance_loop(
    cache_mgr: std::sync::Arc<CacheMgr>,
    interval: Duration,
    cancel: tokio_util::sync::CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = cache_mgr.run_maintenance().await {
                        tracing::error!(error = %e, "cache maintenance failed");
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("cache maintenance loop exiting");
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn size_cap_evicts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheMgr::new(dir.path().to_path_buf(), 3 * 1024 * 1024, Duration::from_secs(86400 * 7));

        for (idx, name) in ["a", "b", "c", "d"].iter().enumerate() {
            let path = dir.path().join(format!("1_{name}.mp4"));
            tokio::fs::write(&path, vec![0u8; 1024 * 1024]).await.unwrap();
            let mtime = std::time::SystemTime::now() + Duration::from_secs(idx as u64);
            let file = tokio::fs::File::open(&path).await.unwrap();
            file.set_modified(mtime).await.unwrap();
        }

        cache.run_maintenance().await.unwrap();
        let totals = cache.totals();
        assert!(totals.total_bytes <= 3 * 1024 * 1024);

        assert!(!tokio::fs::try_exists(dir.path().join("1_a.mp4")).await.unwrap());
        assert!(tokio::fs::try_exists(dir.path().join("1_d.mp4")).await.unwrap());
    }

    #[tokio::test]
    async fn clear_media_removes_hls_tree_and_mp4s() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheMgr::new(dir.path().to_path_buf(), u64::MAX, Duration::from_secs(86400));
        tokio::fs::create_dir_all(cache.hls_dir(7)).await.unwrap();
        tokio::fs::write(cache.hls_dir(7).join("playlist.m3u8"), b"x").await.unwrap();
        tokio::fs::write(cache.mp4_path(7, "720p"), b"x").await.unwrap();

        cache.clear_media(7).await.unwrap();

        assert!(!tokio::fs::try_exists(cache.hls_dir(7)).await.unwrap());
        assert!(!tokio::fs::try_exists(cache.mp4_path(7, "720p")).await.unwrap());
    }
}
