use super::models::Subtitle;
use super::Store;

impl Store {
    pub async fn insert_subtitle(
        &self,
        media_item_id: i64,
        language: &str,
        label: &str,
        file_path: &str,
        format: &str,
        is_default: bool,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO subtitles (media_item_id, language, label, file_path, format, is_default)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(media_item_id)
        .bind(language)
        .bind(label)
        .bind(file_path)
        .bind(format)
        .bind(is_default)
        .fetch_one(self.pool())
        .await
    }

    pub async fn has_any_subtitle(&self, media_item_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subtitles WHERE media_item_id = ?")
            .bind(media_item_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count > 0)
    }

    pub async fn list_subtitles_for_media(&self, media_item_id: i64) -> Result<Vec<Subtitle>, sqlx::Error> {
        sqlx::query_as::<_, Subtitle>(
            "SELECT * FROM subtitles WHERE media_item_id = ? ORDER BY is_default DESC, language ASC",
        )
        .bind(media_item_id)
        .fetch_all(self.pool())
        .await
    }

    pub async fn get_subtitle(&self, id: i64) -> Result<Subtitle, sqlx::Error> {
        sqlx::query_as::<_, Subtitle>("SELECT * FROM subtitles WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
    }
}
