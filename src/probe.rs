use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct VideoStreamInfo {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub bitrate: Option<u64>,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub bitrate: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub duration: f64,
    pub size: u64,
    pub bitrate: Option<u64>,
    pub container: String,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
    pub quality_label: String,
}

const WEB_NATIVE_CONTAINERS: &[&str] = &["mp4", "mov", "m4v"];
const WEB_NATIVE_VIDEO_CODECS: &[&str] = &["h264", "vp8", "vp9"];

#[derive(Debug, Clone, Copy)]
pub struct LadderRung {
    pub label: &'static str,
    pub height: u32,
    pub video_bitrate_kbps: u32,
}

const LADDER: &[LadderRung] = &[
    LadderRung { label: "4K", height: 2160, video_bitrate_kbps: 8000 },
    LadderRung { label: "1080p", height: 1080, video_bitrate_kbps: 5000 },
    LadderRung { label: "720p", height: 720, video_bitrate_kbps: 2500 },
    LadderRung { label: "480p", height: 480, video_bitrate_kbps: 1000 },
    LadderRung { label: "360p", height: 360, video_bitrate_kbps: 600 },
];

pub fn quality_label_for_height(height: u32) -> &'static str {
    if height >= 2160 {
        "4K"
    } else if height >= 1440 {
        "2K"
    } else if height >= 1080 {
        "1080p"
    } else if height >= 720 {
        "720p"
    } else if height >= 480 {
        "480p"
    } else if height >= 360 {
        "360p"
    } else {
        "SD"
    }
}

/// Ladder is the subset of rungs whose height does not exceed the source's.
pub fn ladder_for_height(source_height: u32) -> Vec<LadderRung> {
    LADDER
        .iter()
        .copied()
        .filter(|rung| rung.height <= source_height)
        .collect()
}

pub fn needs_transcoding(probe: &ProbeResult) -> bool {
    let container_ok = WEB_NATIVE_CONTAINERS.contains(&probe.container.as_str());
    let codec_ok = probe
        .video
        .as_ref()
        .map(|v| WEB_NATIVE_VIDEO_CODECS.contains(&v.codec.as_str()))
        .unwrap_or(true);
    let height_ok = probe.video.as_ref().map(|v| v.height <= 1080).unwrap_or(true);
    !(container_ok && codec_ok && height_ok)
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
    format_name: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
    bit_rate: Option<String>,
    profile: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

fn parse_frame_rate(raw: &str) -> f64 {
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.parse().unwrap_or(0.0);
        let den: f64 = den.parse().unwrap_or(1.0);
        if den != 0.0 {
            return num / den;
        }
    }
    raw.parse().unwrap_or(0.0)
}

/// Shells out to `ffprobe`, treated as an external collaborator binary per
/// spec.md §6, matching the teacher's `source.rs` subprocess idiom.
pub async fn probe(ffprobe_path: &Path, video_path: &Path) -> AppResult<ProbeResult> {
    let output = tokio::process::Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(video_path)
        .output()
        .await
        .map_err(|e| AppError::TranscoderUnavailable(e.to_string()))?;

    if !output.status.success() {
        return Err(AppError::Upstream(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("ffprobe output parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .map(|s| VideoStreamInfo {
            codec: s.codec_name.clone().unwrap_or_default(),
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
            fps: s
                .avg_frame_rate
                .as_deref()
                .map(parse_frame_rate)
                .unwrap_or(0.0),
            bitrate: s.bit_rate.as_ref().and_then(|b| b.parse().ok()),
            profile: s.profile.clone(),
        });

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .map(|s| AudioStreamInfo {
            codec: s.codec_name.clone().unwrap_or_default(),
            sample_rate: s
                .sample_rate
                .as_ref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            channels: s.channels.unwrap_or(0),
            bitrate: s.bit_rate.as_ref().and_then(|b| b.parse().ok()),
        });

    let height = video.as_ref().map(|v| v.height).unwrap_or(0);

    Ok(ProbeResult {
        duration: parsed
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        size: parsed
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        bitrate: parsed.format.bit_rate.as_ref().and_then(|b| b.parse().ok()),
        container: parsed
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("")
            .to_string(),
        video,
        audio,
        quality_label: quality_label_for_height(height).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_label_buckets() {
        assert_eq!(quality_label_for_height(2160), "4K");
        assert_eq!(quality_label_for_height(1440), "2K");
        assert_eq!(quality_label_for_height(1080), "1080p");
        assert_eq!(quality_label_for_height(720), "720p");
        assert_eq!(quality_label_for_height(480), "480p");
        assert_eq!(quality_label_for_height(360), "360p");
        assert_eq!(quality_label_for_height(240), "SD");
    }

    #[test]
    fn ladder_excludes_rungs_above_source_height() {
        let ladder = ladder_for_height(1080);
        assert!(ladder.iter().all(|r| r.height <= 1080));
        assert!(ladder.iter().any(|r| r.label == "1080p"));
        assert!(!ladder.iter().any(|r| r.label == "4K"));
    }

    #[test]
    fn needs_transcoding_flags_non_web_native_container() {
        let probe = ProbeResult {
            duration: 100.0,
            size: 0,
            bitrate: None,
            container: "matroska".to_string(),
            video: Some(VideoStreamInfo {
                codec: "h264".into(),
                width: 1920,
                height: 1080,
                fps: 24.0,
                bitrate: None,
                profile: None,
            }),
            audio: None,
            quality_label: "1080p".into(),
        };
        assert!(needs_transcoding(&probe));
    }

    #[test]
    fn web_native_mp4_h264_1080p_does_not_need_transcoding() {
        let probe = ProbeResult {
            duration: 100.0,
            size: 0,
            bitrate: None,
            container: "mp4".to_string(),
            video: Some(VideoStreamInfo {
                codec: "h264".into(),
                width: 1920,
                height: 1080,
                fps: 24.0,
                bitrate: None,
                profile: None,
            }),
            audio: None,
            quality_label: "1080p".into(),
        };
        assert!(!needs_transcoding(&probe));
    }
}
