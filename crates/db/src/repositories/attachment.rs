use sqlx::Row;

use ticketry_core::domain::attachment::{AttachmentId, AttachmentMeta};
use ticketry_core::domain::request::RequestId;

use super::user::parse_timestamp;
use super::{AttachmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAttachmentRepository {
    pool: DbPool,
}

impl SqlAttachmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_attachment(row: &sqlx::sqlite::SqliteRow) -> Result<AttachmentMeta, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let request_id: String = row.try_get("request_id").map_err(decode)?;
    let original_filename: String = row.try_get("original_filename").map_err(decode)?;
    let stored_filename: String = row.try_get("stored_filename").map_err(decode)?;
    let file_size: i64 = row.try_get("file_size").map_err(decode)?;
    let mime_type: String = row.try_get("mime_type").map_err(decode)?;
    let uploaded_at: String = row.try_get("uploaded_at").map_err(decode)?;

    Ok(AttachmentMeta {
        id: AttachmentId(id),
        request_id: RequestId(request_id),
        original_filename,
        stored_filename,
        file_size: file_size.max(0) as u64,
        mime_type,
        uploaded_at: parse_timestamp(&uploaded_at),
    })
}

#[async_trait::async_trait]
impl AttachmentRepository for SqlAttachmentRepository {
    async fn find_by_id(
        &self,
        id: &AttachmentId,
    ) -> Result<Option<AttachmentMeta>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, request_id, original_filename, stored_filename, file_size, mime_type,
                    uploaded_at
             FROM request_attachments WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_attachment(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, meta: AttachmentMeta) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO request_attachments (id, request_id, original_filename, stored_filename,
                                              file_size, mime_type, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meta.id.0)
        .bind(&meta.request_id.0)
        .bind(&meta.original_filename)
        .bind(&meta.stored_filename)
        .bind(meta.file_size as i64)
        .bind(&meta.mime_type)
        .bind(meta.uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<AttachmentMeta>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, original_filename, stored_filename, file_size, mime_type,
                    uploaded_at
             FROM request_attachments WHERE request_id = ? ORDER BY uploaded_at ASC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_attachment).collect::<Result<Vec<_>, _>>()
    }

    async fn count_for_request(&self, request_id: &RequestId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM request_attachments WHERE request_id = ?")
                .bind(&request_id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn delete(&self, id: &AttachmentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM request_attachments WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
