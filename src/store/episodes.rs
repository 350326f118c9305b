use super::models::Episode;
use super::Store;

impl Store {
    /// Idempotent insert keyed on `(tv_show_id, season_number, episode_number)`.
    pub async fn upsert_episode(
        &self,
        tv_show_id: i64,
        season_number: i64,
        episode_number: i64,
        media_item_id: i64,
        episode_title: Option<&str>,
    ) -> Result<(i64, bool), sqlx::Error> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM episodes WHERE tv_show_id = ? AND season_number = ? AND episode_number = ?",
        )
        .bind(tv_show_id)
        .bind(season_number)
        .bind(episode_number)
        .fetch_optional(self.pool())
        .await?;

        if let Some(id) = existing {
            return Ok((id, false));
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO episodes (tv_show_id, season_number, episode_number, media_item_id, episode_title)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(tv_show_id)
        .bind(season_number)
        .bind(episode_number)
        .bind(media_item_id)
        .bind(episode_title)
        .fetch_one(self.pool())
        .await?;

        Ok((id, true))
    }

    pub async fn list_episodes_for_show(&self, tv_show_id: i64) -> Result<Vec<Episode>, sqlx::Error> {
        sqlx::query_as::<_, Episode>(
            "SELECT * FROM episodes WHERE tv_show_id = ? ORDER BY season_number, episode_number",
        )
        .bind(tv_show_id)
        .fetch_all(self.pool())
        .await
    }

    pub async fn get_episode(&self, id: i64) -> Result<Episode, sqlx::Error> {
        sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
    }

    pub async fn get_episode_by_media_item(&self, media_item_id: i64) -> Result<Episode, sqlx::Error> {
        sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE media_item_id = ?")
            .bind(media_item_id)
            .fetch_one(self.pool())
            .await
    }

    /// Next episode strictly after `(season, episode)` within the same show,
    /// crossing season boundaries. `None` if this is the last episode.
    pub async fn next_episode(
        &self,
        tv_show_id: i64,
        season_number: i64,
        episode_number: i64,
    ) -> Result<Option<Episode>, sqlx::Error> {
        sqlx::query_as::<_, Episode>(
            r#"
            SELECT * FROM episodes
            WHERE tv_show_id = ?
              AND (season_number > ? OR (season_number = ? AND episode_number > ?))
            ORDER BY season_number ASC, episode_number ASC
            LIMIT 1
            "#,
        )
        .bind(tv_show_id)
        .bind(season_number)
        .bind(season_number)
        .bind(episode_number)
        .fetch_optional(self.pool())
        .await
    }

    /// Symmetric counterpart of `next_episode`.
    pub async fn previous_episode(
        &self,
        tv_show_id: i64,
        season_number: i64,
        episode_number: i64,
    ) -> Result<Option<Episode>, sqlx::Error> {
        sqlx::query_as::<_, Episode>(
            r#"
            SELECT * FROM episodes
            WHERE tv_show_id = ?
              AND (season_number < ? OR (season_number = ? AND episode_number < ?))
            ORDER BY season_number DESC, episode_number DESC
            LIMIT 1
            "#,
        )
        .bind(tv_show_id)
        .bind(season_number)
        .bind(season_number)
        .bind(episode_number)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn touch_episode_metadata(
        &self,
        id: i64,
        episode_title: Option<&str>,
        episode_overview: Option<&str>,
        air_date: Option<&str>,
        still_path: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE episodes SET episode_title = ?, episode_overview = ?, air_date = ?, still_path = ? WHERE id = ?",
        )
        .bind(episode_title)
        .bind(episode_overview)
        .bind(air_date)
        .bind(still_path)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
