use super::models::{ProtocolKind, Source};
use super::Store;

pub struct NewSource {
    pub display_name: String,
    pub protocol_kind: ProtocolKind,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub username: Option<String>,
    pub encrypted_credential: Option<Vec<u8>>,
    pub base_path: Option<String>,
    pub domain: Option<String>,
}

impl Store {
    pub async fn create_source(&self, new: NewSource) -> Result<Source, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sources
                (display_name, protocol_kind, host, port, username, encrypted_credential, base_path, domain)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&new.display_name)
        .bind(new.protocol_kind)
        .bind(&new.host)
        .bind(new.port)
        .bind(&new.username)
        .bind(&new.encrypted_credential)
        .bind(&new.base_path)
        .bind(&new.domain)
        .fetch_one(self.pool())
        .await?;

        self.get_source(id).await
    }

    pub async fn get_source(&self, id: i64) -> Result<Source, sqlx::Error> {
        sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
    }

    pub async fn list_sources(&self) -> Result<Vec<Source>, sqlx::Error> {
        sqlx::query_as::<_, Source>("SELECT * FROM sources ORDER BY id ASC")
            .fetch_all(self.pool())
            .await
    }

    pub async fn update_source_enabled(&self, id: i64, enabled: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sources SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Sources are soft-disabled, never hard-deleted, while MediaItems still
    /// reference them (spec.md §3). Callers that truly want removal should
    /// first confirm there are zero referencing media_items.
    pub async fn media_item_count_for_source(&self, source_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(self.pool())
            .await
    }

    pub async fn delete_source(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
