use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct MovieMetadata {
    pub external_id: String,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TvShowMetadata {
    pub external_id: String,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub status: Option<String>,
}

/// External metadata lookups are kept behind this trait so the indexer
/// never depends on a specific provider's wire format, matching the
/// teacher's protocol-client abstraction for remote collaborators.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn search_movie(&self, title: &str, year: Option<i64>) -> AppResult<Option<MovieMetadata>>;
    async fn search_tv_show(&self, title: &str) -> AppResult<Option<TvShowMetadata>>;
}

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

pub struct TmdbProvider {
    http: reqwest::Client,
    api_key: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, language: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            language,
        }
    }

    fn image_url(path: Option<&str>) -> Option<String> {
        path.map(|p| format!("{TMDB_IMAGE_BASE_URL}{p}"))
    }
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: i64,
    overview: Option<String>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvShow {
    id: i64,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i64>,
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search_movie(&self, title: &str, year: Option<i64>) -> AppResult<Option<MovieMetadata>> {
        let mut query = vec![
            ("api_key".to_string(), self.api_key.clone()),
            ("language".to_string(), self.language.clone()),
            ("query".to_string(), title.to_string()),
        ];
        if let Some(year) = year {
            query.push(("year".to_string(), year.to_string()));
        }

        let response: TmdbSearchResponse<TmdbMovie> = self
            .http
            .get(format!("{TMDB_BASE_URL}/search/movie"))
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        Ok(response.results.into_iter().next().map(|movie| MovieMetadata {
            external_id: movie.id.to_string(),
            overview: movie.overview,
            rating: movie.vote_average,
            genres: movie.genre_ids.iter().map(|id| id.to_string()).collect(),
            poster_url: Self::image_url(movie.poster_path.as_deref()),
            backdrop_url: Self::image_url(movie.backdrop_path.as_deref()),
        }))
    }

    async fn search_tv_show(&self, title: &str) -> AppResult<Option<TvShowMetadata>> {
        let query = [
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
            ("query", title),
        ];

        let response: TmdbSearchResponse<TmdbTvShow> = self
            .http
            .get(format!("{TMDB_BASE_URL}/search/tv"))
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        Ok(response.results.into_iter().next().map(|show| TvShowMetadata {
            external_id: show.id.to_string(),
            overview: show.overview,
            genres: show.genre_ids.iter().map(|id| id.to_string()).collect(),
            poster_url: Self::image_url(show.poster_path.as_deref()),
            backdrop_url: Self::image_url(show.backdrop_path.as_deref()),
            status: None,
        }))
    }
}
