//! Per-site watermark table

use sqlx::Sqlite;

use super::MeshStore;
use super::error::Result;
use super::models::{SiteCursor, SiteCursorRow};

/// Create the cursor row for `site_id` or overwrite its value
pub async fn upsert_cursor<'c, E>(
    exe: E,
    site_id: &str,
    cursor_value: &str,
    now_ms: i64,
) -> std::result::Result<(), sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let query = r#"
        INSERT INTO site_cursors (site_id, cursor_value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (site_id) DO UPDATE SET
            cursor_value = excluded.cursor_value,
            updated_at = excluded.updated_at
    "#;
    sqlx::query(query)
        .bind(site_id)
        .bind(cursor_value)
        .bind(now_ms)
        .execute(exe)
        .await?;
    Ok(())
}

impl MeshStore {
    pub async fn get_cursor(&self, site_id: &str) -> Result<Option<SiteCursor>> {
        let query = r#"
            SELECT site_id, cursor_value, updated_at
            FROM site_cursors
            WHERE site_id = ?1
        "#;
        let row: Option<SiteCursorRow> = sqlx::query_as(query)
            .bind(site_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(SiteCursor::from))
    }

    pub async fn list_cursors(&self) -> Result<Vec<SiteCursor>> {
        let query = r#"
            SELECT site_id, cursor_value, updated_at
            FROM site_cursors
            ORDER BY site_id ASC
        "#;
        let rows: Vec<SiteCursorRow> = sqlx::query_as(query).fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(SiteCursor::from).collect())
    }
}
