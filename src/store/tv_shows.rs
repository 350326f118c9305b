use super::models::TvShow;
use super::Store;

impl Store {
    /// Upserts the TvShow row paired with a TvShow-variant MediaItem, keyed
    /// by show title under a given source. Returns the tv_shows.id.
    pub async fn upsert_tv_show(
        &self,
        media_item_id: i64,
        title: &str,
    ) -> Result<i64, sqlx::Error> {
        let existing =
            sqlx::query_scalar::<_, i64>("SELECT id FROM tv_shows WHERE media_item_id = ?")
                .bind(media_item_id)
                .fetch_optional(self.pool())
                .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        sqlx::query_scalar::<_, i64>(
            "INSERT INTO tv_shows (media_item_id, title) VALUES (?, ?) RETURNING id",
        )
        .bind(media_item_id)
        .bind(title)
        .fetch_one(self.pool())
        .await
    }

    pub async fn find_tv_show_by_title(&self, title: &str) -> Result<Option<TvShow>, sqlx::Error> {
        sqlx::query_as::<_, TvShow>("SELECT * FROM tv_shows WHERE title = ?")
            .bind(title)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn get_tv_show(&self, id: i64) -> Result<TvShow, sqlx::Error> {
        sqlx::query_as::<_, TvShow>("SELECT * FROM tv_shows WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
    }

    pub async fn get_tv_show_by_media_item(
        &self,
        media_item_id: i64,
    ) -> Result<TvShow, sqlx::Error> {
        sqlx::query_as::<_, TvShow>("SELECT * FROM tv_shows WHERE media_item_id = ?")
            .bind(media_item_id)
            .fetch_one(self.pool())
            .await
    }

    pub async fn recompute_tv_show_counts(&self, tv_show_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE tv_shows SET
                season_count = (SELECT COUNT(DISTINCT season_number) FROM episodes WHERE tv_show_id = ?),
                episode_count = (SELECT COUNT(*) FROM episodes WHERE tv_show_id = ?)
            WHERE id = ?
            "#,
        )
        .bind(tv_show_id)
        .bind(tv_show_id)
        .bind(tv_show_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn touch_tv_show_metadata(
        &self,
        id: i64,
        external_id: Option<&str>,
        overview: Option<&str>,
        first_air_date: Option<&str>,
        status: Option<&str>,
        poster_url: Option<&str>,
        backdrop_url: Option<&str>,
        genres: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE tv_shows SET
                external_id = ?, overview = ?, first_air_date = ?, status = ?,
                poster_url = ?, backdrop_url = ?, genres = ?
            WHERE id = ?
            "#,
        )
        .bind(external_id)
        .bind(overview)
        .bind(first_air_date)
        .bind(status)
        .bind(poster_url)
        .bind(backdrop_url)
        .bind(genres)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
