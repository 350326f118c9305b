use std::path::Path;

use tokio::process::Command;

#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub label: &'static str,
    pub height: u32,
    pub video_bitrate_kbps: u32,
    pub fps: u32,
    pub preset: &'static str,
}

pub const PROFILES: &[Profile] = &[
    Profile { label: "4K", height: 2160, video_bitrate_kbps: 8000, fps: 30, preset: "veryfast" },
    Profile { label: "1080p", height: 1080, video_bitrate_kbps: 5000, fps: 30, preset: "veryfast" },
    Profile { label: "720p", height: 720, video_bitrate_kbps: 2500, fps: 30, preset: "veryfast" },
    Profile { label: "480p", height: 480, video_bitrate_kbps: 1000, fps: 30, preset: "veryfast" },
    Profile { label: "360p", height: 360, video_bitrate_kbps: 600, fps: 30, preset: "veryfast" },
];

pub fn profile_by_label(label: &str) -> Option<Profile> {
    PROFILES.iter().copied().find(|p| p.label == label)
}

/// Builds the `ffmpeg` argument list for a full-file MP4 transcode with
/// fast-start (moov atom at head), matching the teacher's `source.rs`
/// command-building idiom.
pub fn mp4_args(input: &Path, output: &Path, profile: Profile) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        format!("scale=-2:{}", profile.height),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        profile.preset.into(),
        "-b:v".into(),
        format!("{}k", profile.video_bitrate_kbps),
        "-r".into(),
        profile.fps.to_string(),
        "-c:a".into(),
        "aac".into(),
        "-movflags".into(),
        "+faststart".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Realtime fragmented MP4 suitable for piping straight to an HTTP
/// response body.
pub fn realtime_fragmented_args(input: &Path, profile: Profile) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        format!("scale=-2:{}", profile.height),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        profile.preset.into(),
        "-b:v".into(),
        format!("{}k", profile.video_bitrate_kbps),
        "-c:a".into(),
        "aac".into(),
        "-f".into(),
        "mp4".into(),
        "-movflags".into(),
        "frag_keyframe+empty_moov+default_base_moof".into(),
        "pipe:1".into(),
    ]
}

/// Fixed-duration HLS segmentation: scene-cut keyframes disabled, GOP
/// forced to `segment_duration * fps`, per spec.md §4.4.
pub fn hls_args(
    input: &Path,
    output_dir: &Path,
    profile: Profile,
    segment_duration_secs: u64,
) -> Vec<String> {
    let gop = segment_duration_secs as u32 * profile.fps;
    vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        format!("scale=-2:{}", profile.height),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        profile.preset.into(),
        "-b:v".into(),
        format!("{}k", profile.video_bitrate_kbps),
        "-r".into(),
        profile.fps.to_string(),
        "-sc_threshold".into(),
        "0".into(),
        "-g".into(),
        gop.to_string(),
        "-keyint_min".into(),
        gop.to_string(),
        "-c:a".into(),
        "aac".into(),
        "-hls_time".into(),
        segment_duration_secs.to_string(),
        "-hls_segment_type".into(),
        "mpegts".into(),
        "-hls_list_size".into(),
        "0".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        "-hls_segment_filename".into(),
        output_dir.join("segment%03d.ts").to_string_lossy().into_owned(),
        output_dir.join("playlist.m3u8").to_string_lossy().into_owned(),
    ]
}

pub fn spawn(ffmpeg_path: &Path, args: &[String]) -> std::io::Result<tokio::process::Child> {
    Command::new(ffmpeg_path)
        .args(args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}
