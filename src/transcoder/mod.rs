pub mod command;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cache_mgr::CacheMgr;
use crate::error::{AppError, AppResult};

use command::Profile;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum JobKey {
    Mp4(PathBuf),
    Hls(i64, String),
}

/// Supervises `ffmpeg` child processes. A mutex per job key enforces "at
/// most one running encoder per key": a racing caller blocks on the same
/// key's lock and, once the first caller finishes, observes the completed
/// artifact instead of re-encoding, matching spec.md §4.4/§5.
pub struct Transcoder {
    ffmpeg_path: PathBuf,
    cache_mgr: Arc<CacheMgr>,
    job_locks: Mutex<HashMap<JobKey, Arc<Mutex<()>>>>,
    cancellations: Mutex<HashMap<JobKey, CancellationToken>>,
    hls_media_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    hls_segment_secs: u64,
}

impl Transcoder {
    pub fn new(ffmpeg_path: PathBuf, cache_mgr: Arc<CacheMgr>, hls_segment_secs: u64) -> Self {
        Self {
            ffmpeg_path,
            cache_mgr,
            job_locks: Mutex::new(HashMap::new()),
            cancellations: Mutex::new(HashMap::new()),
            hls_media_locks: Mutex::new(HashMap::new()),
            hls_segment_secs,
        }
    }

    async fn lock_for(&self, key: JobKey) -> Arc<Mutex<()>> {
        let mut locks = self.job_locks.lock().await;
        locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn media_lock(&self, media_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.hls_media_locks.lock().await;
        locks
            .entry(media_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs one ffmpeg invocation to completion, racing its exit against
    /// cancellation, grounded in `progress.rs`'s `observe_ffmpeg_task` and
    /// `watch/hls_stream/job.rs`'s `run_hls_handler` select loops.
    async fn run_to_completion(
        &self,
        key: JobKey,
        args: &[String],
        output_paths: &[PathBuf],
    ) -> AppResult<()> {
        let mut child = command::spawn(&self.ffmpeg_path, args).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::TranscoderUnavailable(e.to_string())
            } else {
                AppError::Internal(e.into())
            }
        })?;

        let cancel = CancellationToken::new();
        self.cancellations.lock().await.insert(key.clone(), cancel.clone());

        for path in output_paths {
            self.cache_mgr.mark_in_flight(path.clone()).await;
        }

        let result = tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) if status.success() => Ok(()),
                    Ok(status) => Err(AppError::EncodeFailed(format!("ffmpeg exited with {status}"))),
                    Err(e) => Err(AppError::Internal(e.into())),
                }
            }
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(AppError::Transient("transcode cancelled".to_string()))
            }
        };

        self.cancellations.lock().await.remove(&key);
        for path in output_paths {
            self.cache_mgr.unmark_in_flight(path).await;
        }

        if result.is_err() {
            for path in output_paths {
                let _ = tokio::fs::remove_file(path).await;
            }
        }

        result
    }

    pub async fn transcode_to_mp4(
        &self,
        input: &std::path::Path,
        output: &std::path::Path,
        profile: Profile,
    ) -> AppResult<()> {
        let args = command::mp4_args(input, output, profile);
        self.run_to_completion(JobKey::Mp4(output.to_path_buf()), &args, &[output.to_path_buf()])
            .await
    }

    /// Cache-hit short-circuit: if the expected output already exists, its
    /// mtime is touched and the path returned without spawning a job.
    pub async fn transcode_quality(
        &self,
        input: &std::path::Path,
        media_id: i64,
        profile: Profile,
    ) -> AppResult<PathBuf> {
        let output = self.cache_mgr.mp4_path(media_id, profile.label);
        let lock = self.lock_for(JobKey::Mp4(output.clone())).await;
        let _guard = lock.lock().await;

        if tokio::fs::metadata(&output).await.is_ok() {
            self.cache_mgr.touch(&output).await;
            return Ok(output);
        }

        self.transcode_to_mp4(input, &output, profile).await?;
        Ok(output)
    }

    /// Realtime fragmented MP4, piped directly to the caller rather than
    /// landing on disk. The caller supplies the cancellation token bound to
    /// its HTTP connection, per spec.md §5.
    pub async fn stream_transcode(
        &self,
        input: &std::path::Path,
        profile: Profile,
        cancel: CancellationToken,
    ) -> AppResult<tokio::sync::mpsc::Receiver<std::io::Result<bytes::Bytes>>> {
        let args = command::realtime_fragmented_args(input, profile);
        let mut child = command::spawn(&self.ffmpeg_path, &args).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::TranscoderUnavailable(e.to_string())
            } else {
                AppError::Internal(e.into())
            }
        })?;

        let mut stdout = child.stdout.take().expect("piped stdout");
        let (tx, rx) = tokio::sync::mpsc::channel(16);

        tokio::spawn(async move {
            let mut buf = [0u8; 64 * 1024];
            loop {
                tokio::select! {
                    read = stdout.read(&mut buf) => {
                        match read {
                            Ok(0) => break,
                            Ok(n) => {
                                if tx.send(Ok(bytes::Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                break;
                            }
                        }
                    }
                    _ = cancel.cancelled() => {
                        break;
                    }
                }
            }
            let _ = child.kill().await;
        });

        Ok(rx)
    }

    /// Generation for one `media_id` is serialized with `media_lock` —
    /// resolution of spec.md §9 open question (a): concurrent adaptive-HLS
    /// requests for the same media_id would otherwise race on the shared
    /// `hls_<media_id>/` tree.
    pub async fn generate_hls(
        &self,
        input: &std::path::Path,
        media_id: i64,
        profile: Profile,
    ) -> AppResult<PathBuf> {
        let media_lock = self.media_lock(media_id).await;
        let _media_guard = media_lock.lock().await;

        let variant_dir = self.cache_mgr.hls_variant_dir(media_id, profile.label);
        let manifest_path = variant_dir.join("playlist.m3u8");

        let key = JobKey::Hls(media_id, profile.label.to_string());
        let lock = self.lock_for(key.clone()).await;
        let _guard = lock.lock().await;

        if tokio::fs::metadata(&manifest_path).await.is_ok() {
            self.cache_mgr.touch(&manifest_path).await;
            return Ok(manifest_path);
        }

        tokio::fs::create_dir_all(&variant_dir)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let args = command::hls_args(input, &variant_dir, profile, self.hls_segment_secs);
        self.run_to_completion(key, &args, &[variant_dir.clone()]).await?;

        Ok(manifest_path)
    }

    pub async fn cancel(&self, key: &JobKey) {
        if let Some(token) = self.cancellations.lock().await.get(key) {
            token.cancel();
        }
    }
}
