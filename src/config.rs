use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 6969;
const DEFAULT_CREDENTIAL_EXPIRY_DAYS: i64 = 7;
const DEFAULT_CACHE_SIZE_CAP_BYTES: u64 = 10 * 1024 * 1024 * 1024;
const DEFAULT_CACHE_TTL_HOURS: i64 = 24 * 7;
const DEFAULT_VIDEO_EXTENSIONS: &str = "mp4,mkv,avi,mov,webm,m4v";
const DEFAULT_HLS_SEGMENT_SECS: u64 = 10;

/// CLI flags. Precedence is CLI > environment variable > config file > default,
/// matching the teacher's settings layering.
#[derive(Debug, Parser)]
#[command(name = "media-server", version, about = "Self-hosted media streaming server")]
pub struct Args {
    #[arg(long, env = "MEDIA_SERVER_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "MEDIA_SERVER_SECRET")]
    pub server_secret: Option<String>,

    #[arg(long, env = "MEDIA_SERVER_DB_PATH")]
    pub database_path: Option<PathBuf>,

    #[arg(long, env = "MEDIA_SERVER_CACHE_ROOT")]
    pub cache_root: Option<PathBuf>,

    #[arg(long, env = "MEDIA_SERVER_CACHE_SIZE_CAP")]
    pub cache_size_cap_bytes: Option<u64>,

    #[arg(long, env = "MEDIA_SERVER_CACHE_TTL_HOURS")]
    pub cache_ttl_hours: Option<i64>,

    #[arg(long, env = "MEDIA_SERVER_VIDEO_EXTENSIONS")]
    pub video_extensions: Option<String>,

    #[arg(long, env = "MEDIA_SERVER_TMDB_KEY")]
    pub metadata_provider_key: Option<String>,

    #[arg(long, env = "MEDIA_SERVER_METADATA_LANGUAGE")]
    pub metadata_language: Option<String>,

    #[arg(long, env = "MEDIA_SERVER_AUTO_ENRICH")]
    pub auto_enrich: Option<bool>,

    #[arg(long, env = "MEDIA_SERVER_FFMPEG_PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    #[arg(long, env = "MEDIA_SERVER_FFPROBE_PATH")]
    pub ffprobe_path: Option<PathBuf>,

    #[arg(long, env = "MEDIA_SERVER_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[arg(long, env = "MEDIA_SERVER_CREDENTIAL_EXPIRY_DAYS")]
    pub credential_expiry_days: Option<i64>,
}

/// Optional TOML overlay, read from `config_file` when present. Every field
/// mirrors an `Args` flag; both layer beneath CLI/env per the precedence
/// order above.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    server_secret: Option<String>,
    database_path: Option<PathBuf>,
    cache_root: Option<PathBuf>,
    cache_size_cap_bytes: Option<u64>,
    cache_ttl_hours: Option<i64>,
    video_extensions: Option<String>,
    metadata_provider_key: Option<String>,
    metadata_language: Option<String>,
    auto_enrich: Option<bool>,
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
    credential_expiry_days: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub server_secret: String,
    pub database_path: PathBuf,
    pub cache_root: PathBuf,
    pub cache_size_cap_bytes: u64,
    pub cache_ttl_hours: i64,
    pub video_extensions: Vec<String>,
    pub metadata_provider_key: Option<String>,
    pub metadata_language: String,
    pub auto_enrich: bool,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub credential_expiry_days: i64,
    pub hls_segment_secs: u64,
}

impl Config {
    pub fn load(args: Args) -> anyhow::Result<Self> {
        let file_config = match &args.config_file {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => FileConfig::default(),
        };

        let server_secret = args
            .server_secret
            .or(file_config.server_secret)
            .unwrap_or_else(|| {
                tracing::warn!("no server secret configured, generating an ephemeral one");
                uuid::Uuid::new_v4().to_string()
            });

        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("media-server");

        let port = args.port.or(file_config.port).unwrap_or(DEFAULT_PORT);
        let video_extensions = args
            .video_extensions
            .or(file_config.video_extensions)
            .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSIONS.to_string())
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            server_secret,
            database_path: args
                .database_path
                .or(file_config.database_path)
                .unwrap_or_else(|| data_dir.join("media-server.sqlite3")),
            cache_root: args
                .cache_root
                .or(file_config.cache_root)
                .unwrap_or_else(|| data_dir.join("cache")),
            cache_size_cap_bytes: args
                .cache_size_cap_bytes
                .or(file_config.cache_size_cap_bytes)
                .unwrap_or(DEFAULT_CACHE_SIZE_CAP_BYTES),
            cache_ttl_hours: args
                .cache_ttl_hours
                .or(file_config.cache_ttl_hours)
                .unwrap_or(DEFAULT_CACHE_TTL_HOURS),
            video_extensions,
            metadata_provider_key: args.metadata_provider_key.or(file_config.metadata_provider_key),
            metadata_language: args
                .metadata_language
                .or(file_config.metadata_language)
                .unwrap_or_else(|| "en-US".to_string()),
            auto_enrich: args.auto_enrich.or(file_config.auto_enrich).unwrap_or(true),
            ffmpeg_path: args
                .ffmpeg_path
                .or(file_config.ffmpeg_path)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            ffprobe_path: args
                .ffprobe_path
                .or(file_config.ffprobe_path)
                .unwrap_or_else(|| PathBuf::from("ffprobe")),
            credential_expiry_days: args
                .credential_expiry_days
                .or(file_config.credential_expiry_days)
                .unwrap_or(DEFAULT_CREDENTIAL_EXPIRY_DAYS),
            hls_segment_secs: DEFAULT_HLS_SEGMENT_SECS,
        })
    }
}
