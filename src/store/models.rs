use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "snake_case")]
pub enum MediaVariant {
    Movie,
    TvShow,
    Episode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(rename_all = "snake_case")]
pub enum ProtocolKind {
    Local,
    Ftp,
    Smb,
    Upnp,
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProtocolKind::Local => "local",
            ProtocolKind::Ftp => "ftp",
            ProtocolKind::Smb => "smb",
            ProtocolKind::Upnp => "upnp",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ProtocolKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(ProtocolKind::Local),
            "ftp" => Ok(ProtocolKind::Ftp),
            "smb" => Ok(ProtocolKind::Smb),
            "upnp" => Ok(ProtocolKind::Upnp),
            other => anyhow::bail!("unknown protocol kind {other}"),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MediaItem {
    pub id: i64,
    pub variant: MediaVariant,
    pub title: String,
    pub year: Option<i64>,
    pub duration_secs: Option<f64>,
    pub file_path: String,
    pub file_size: i64,
    pub source_kind: ProtocolKind,
    pub source_id: Option<i64>,
    pub external_id: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub genres: Option<String>,
    pub cast: Option<String>,
    pub quality_label: Option<String>,
    pub added_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TvShow {
    pub id: i64,
    pub media_item_id: i64,
    pub external_id: Option<String>,
    pub title: String,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    pub season_count: i64,
    pub episode_count: i64,
    pub status: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub genres: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Episode {
    pub id: i64,
    pub tv_show_id: i64,
    pub season_number: i64,
    pub episode_number: i64,
    pub media_item_id: i64,
    pub episode_title: Option<String>,
    pub episode_overview: Option<String>,
    pub air_date: Option<String>,
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Source {
    pub id: i64,
    pub display_name: String,
    pub protocol_kind: ProtocolKind,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub encrypted_credential: Option<Vec<u8>>,
    pub base_path: Option<String>,
    pub domain: Option<String>,
    pub enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Subtitle {
    pub id: i64,
    pub media_item_id: i64,
    pub language: String,
    pub label: String,
    pub file_path: String,
    pub format: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WatchRecord {
    pub id: i64,
    pub user_id: i64,
    pub media_item_id: i64,
    pub current_secs: f64,
    pub total_secs: f64,
    pub progress: f64,
    pub completed: bool,
    pub watch_count: i64,
    pub last_watched: String,
    pub created_at: String,
}
