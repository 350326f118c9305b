use super::models::{MediaItem, MediaVariant, ProtocolKind};
use super::Store;

pub struct NewMediaItem {
    pub variant: MediaVariant,
    pub title: String,
    pub year: Option<i64>,
    pub duration_secs: Option<f64>,
    pub file_path: String,
    pub file_size: i64,
    pub source_kind: ProtocolKind,
    pub source_id: Option<i64>,
    pub quality_label: Option<String>,
}

impl Store {
    /// Idempotent insert keyed on `(source_kind, source_id, file_path)`.
    /// Mirrors the teacher's `INSERT OR IGNORE ... RETURNING id` plus
    /// fallback `SELECT` pattern from `db.rs`.
    pub async fn upsert_media_item(&self, new: NewMediaItem) -> Result<(i64, bool), sqlx::Error> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM media_items WHERE source_kind = ? AND source_id IS ? AND file_path = ?",
        )
        .bind(new.source_kind)
        .bind(new.source_id)
        .bind(&new.file_path)
        .fetch_optional(self.pool())
        .await?;

        if let Some(id) = existing {
            return Ok((id, false));
        }

        let variant = new.variant;
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO media_items
                (variant, title, year, duration_secs, file_path, file_size,
                 source_kind, source_id, quality_label)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(variant)
        .bind(&new.title)
        .bind(new.year)
        .bind(new.duration_secs)
        .bind(&new.file_path)
        .bind(new.file_size)
        .bind(new.source_kind)
        .bind(new.source_id)
        .bind(&new.quality_label)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(id) => Ok((id, true)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let id = sqlx::query_scalar::<_, i64>(
                    "SELECT id FROM media_items WHERE source_kind = ? AND source_id IS ? AND file_path = ?",
                )
                .bind(new.source_kind)
                .bind(new.source_id)
                .bind(&new.file_path)
                .fetch_one(self.pool())
                .await?;
                Ok((id, false))
            }
            Err(other) => Err(other),
        }
    }

    pub async fn get_media_item(&self, id: i64) -> Result<MediaItem, sqlx::Error> {
        sqlx::query_as::<_, MediaItem>("SELECT * FROM media_items WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
    }

    pub async fn list_movies(&self) -> Result<Vec<MediaItem>, sqlx::Error> {
        sqlx::query_as::<_, MediaItem>(
            "SELECT * FROM media_items WHERE variant = 'movie' ORDER BY title ASC",
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn list_tv_show_media_items(&self) -> Result<Vec<MediaItem>, sqlx::Error> {
        sqlx::query_as::<_, MediaItem>(
            "SELECT * FROM media_items WHERE variant = 'tv_show' ORDER BY title ASC",
        )
        .fetch_all(self.pool())
        .await
    }

    pub async fn search_media_items(
        &self,
        query: &str,
        variant: Option<MediaVariant>,
        limit: i64,
    ) -> Result<Vec<MediaItem>, sqlx::Error> {
        let like_prefix = format!("{}%", query);
        let like_anywhere = format!("%{}%", query);
        let variant_filter = variant.map(|v| match v {
            MediaVariant::Movie => "movie",
            MediaVariant::TvShow => "tv_show",
            MediaVariant::Episode => "episode",
        });

        sqlx::query_as::<_, MediaItem>(
            r#"
            SELECT * FROM media_items
            WHERE title LIKE ?
              AND (? IS NULL OR variant = ?)
            ORDER BY
                CASE WHEN title LIKE ? THEN 0 ELSE 1 END,
                rating DESC,
                year DESC
            LIMIT ?
            "#,
        )
        .bind(&like_anywhere)
        .bind(variant_filter)
        .bind(variant_filter)
        .bind(&like_prefix)
        .bind(limit)
        .fetch_all(self.pool())
        .await
    }

    pub async fn delete_media_item(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM media_items WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn count_media_items(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM media_items")
            .fetch_one(self.pool())
            .await
    }

    pub async fn touch_media_item_metadata(
        &self,
        id: i64,
        external_id: Option<&str>,
        overview: Option<&str>,
        rating: Option<f64>,
        genres: Option<&str>,
        poster_url: Option<&str>,
        backdrop_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE media_items SET
                external_id = ?, overview = ?, rating = ?, genres = ?,
                poster_url = ?, backdrop_url = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
            "#,
        )
        .bind(external_id)
        .bind(overview)
        .bind(rating)
        .bind(genres)
        .bind(poster_url)
        .bind(backdrop_url)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
