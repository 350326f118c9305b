use super::models::WatchRecord;
use super::Store;

const COMPLETED_THRESHOLD: f64 = 0.95;

/// Historical rows may carry `progress` as a 0-100 percentage. Values above
/// 1.0 are migrated in place on read — spec.md §9 open question (c).
fn normalize_fraction(progress: f64) -> f64 {
    if progress > 1.0 {
        progress / 100.0
    } else {
        progress
    }
}

impl Store {
    /// Upserts the (user, media_item) watch record. A second "watch" of an
    /// already-completed item increments `watch_count` instead of inserting
    /// a new row.
    pub async fn upsert_watch_progress(
        &self,
        user_id: i64,
        media_item_id: i64,
        current_secs: f64,
        total_secs: f64,
    ) -> Result<WatchRecord, sqlx::Error> {
        let progress = if total_secs > 0.0 {
            (current_secs / total_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let completed = progress >= COMPLETED_THRESHOLD;

        let existing = self.get_watch_record(user_id, media_item_id).await?;

        match existing {
            Some(row) => {
                let watch_count = if completed && !row.completed {
                    row.watch_count + 1
                } else {
                    row.watch_count
                };
                sqlx::query(
                    r#"
                    UPDATE watch_records SET
                        current_secs = ?, total_secs = ?, progress = ?, completed = ?,
                        watch_count = ?, last_watched = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                    WHERE user_id = ? AND media_item_id = ?
                    "#,
                )
                .bind(current_secs)
                .bind(total_secs)
                .bind(progress)
                .bind(completed)
                .bind(watch_count)
                .bind(user_id)
                .bind(media_item_id)
                .execute(self.pool())
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO watch_records
                        (user_id, media_item_id, current_secs, total_secs, progress, completed, watch_count)
                    VALUES (?, ?, ?, ?, ?, ?, 1)
                    "#,
                )
                .bind(user_id)
                .bind(media_item_id)
                .bind(current_secs)
                .bind(total_secs)
                .bind(progress)
                .bind(completed)
                .execute(self.pool())
                .await?;
            }
        }

        Ok(self
            .get_watch_record(user_id, media_item_id)
            .await?
            .expect("row just written"))
    }

    pub async fn get_watch_record(
        &self,
        user_id: i64,
        media_item_id: i64,
    ) -> Result<Option<WatchRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = ? AND media_item_id = ?",
        )
        .bind(user_id)
        .bind(media_item_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|mut r| {
            r.progress = normalize_fraction(r.progress);
            r
        }))
    }

    pub async fn mark_watched(
        &self,
        user_id: i64,
        media_item_id: i64,
        duration_secs: f64,
    ) -> Result<WatchRecord, sqlx::Error> {
        self.upsert_watch_progress(user_id, media_item_id, duration_secs, duration_secs)
            .await
    }

    pub async fn mark_unwatched(&self, user_id: i64, media_item_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM watch_records WHERE user_id = ? AND media_item_id = ?")
            .bind(user_id)
            .bind(media_item_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn continue_watching(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<WatchRecord>, sqlx::Error> {
        sqlx::query_as::<_, WatchRecord>(
            r#"
            SELECT * FROM watch_records
            WHERE user_id = ? AND completed = 0 AND progress > 0
            ORDER BY last_watched DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
    }

    pub async fn recently_watched(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<WatchRecord>, sqlx::Error> {
        sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = ? ORDER BY last_watched DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
    }

    pub async fn watch_history(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WatchRecord>, sqlx::Error> {
        sqlx::query_as::<_, WatchRecord>(
            "SELECT * FROM watch_records WHERE user_id = ? ORDER BY last_watched DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await
    }

    pub async fn reset_watch_progress(&self, user_id: i64, media_item_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE watch_records SET current_secs = 0, progress = 0, completed = 0 WHERE user_id = ? AND media_item_id = ?",
        )
        .bind(user_id)
        .bind(media_item_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn watch_stats(&self, user_id: i64) -> Result<(i64, f64, i64), sqlx::Error> {
        let row: (i64, Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), SUM(current_secs), COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0)
            FROM watch_records WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok((row.0, row.1.unwrap_or(0.0), row.2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[tokio::test]
    async fn progress_and_completion_math() {
        let store = Store::connect_in_memory().await.unwrap();
        let user = store.create_user("alice", "hash", false).await.unwrap();
        let (media_id, _) = store
            .upsert_media_item(crate::store::media_items::NewMediaItem {
                variant: crate::store::models::MediaVariant::Movie,
                title: "Test Movie".into(),
                year: None,
                duration_secs: Some(100.0),
                file_path: "/movies/test.mp4".into(),
                file_size: 1024,
                source_kind: crate::store::models::ProtocolKind::Local,
                source_id: None,
                quality_label: None,
            })
            .await
            .unwrap();

        let record = store
            .upsert_watch_progress(user.id, media_id, 50.0, 100.0)
            .await
            .unwrap();
        assert!((record.progress - 0.5).abs() < 1e-9);
        assert!(!record.completed);

        let record = store
            .upsert_watch_progress(user.id, media_id, 96.0, 100.0)
            .await
            .unwrap();
        assert!(record.completed);
        assert_eq!(record.watch_count, 2);

        store.mark_unwatched(user.id, media_id).await.unwrap();
        let record = store.get_watch_record(user.id, media_id).await.unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn legacy_percentage_is_migrated_to_fraction() {
        assert!((normalize_fraction(50.0) - 0.5).abs() < 1e-9);
        assert!((normalize_fraction(0.42) - 0.42).abs() < 1e-9);
    }
}
