//! File catalog
//!
//! Thin CRUD over file records. All writes to the `files` table go through
//! this type, which is where the lifecycle invariants are enforced: the
//! object key never changes and status never moves backwards.

use ldp_common::ObjectId;
use sqlx::PgPool;
use tracing::warn;

use crate::db::{DbError, DbResult};
use crate::features::shared::pagination::PaginationParams;

use super::types::{FileRecord, FileRow, FileStatus};

const FILE_COLUMNS: &str =
    "id, object_key, original_name, size_bytes, content_type, status, created_at";

#[derive(Clone)]
pub struct FileCatalog {
    pool: PgPool,
}

impl FileCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a file record after its object-store put has fully completed.
    pub async fn create(
        &self,
        object_key: &str,
        original_name: &str,
        size_bytes: i64,
        content_type: &str,
    ) -> DbResult<FileRecord> {
        let id = ObjectId::generate();

        let sql = format!(
            "INSERT INTO files (id, object_key, original_name, size_bytes, content_type, status) \
             VALUES ($1, $2, $3, $4, $5, 'uploaded') \
             RETURNING {FILE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(id.as_str())
            .bind(object_key)
            .bind(original_name)
            .bind(size_bytes)
            .bind(content_type)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    DbError::duplicate("File", object_key)
                },
                _ => DbError::Sqlx(err),
            })?;

        Ok(row.into())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1");

        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_by_key(&self, object_key: &str) -> DbResult<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE object_key = $1");

        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(object_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Advance a file's status. Returns whether a row changed.
    ///
    /// Status is monotonic: requests that would regress `processed` back to
    /// `uploaded` are refused without touching the row.
    pub async fn set_status(&self, id: &str, status: FileStatus) -> DbResult<bool> {
        match status {
            FileStatus::Processed => {
                let result = sqlx::query(
                    "UPDATE files SET status = 'processed' WHERE id = $1 AND status = 'uploaded'",
                )
                .bind(id)
                .execute(&self.pool)
                .await?;

                Ok(result.rows_affected() > 0)
            },
            FileStatus::Uploaded => {
                warn!(file_id = %id, "refusing file status regression to 'uploaded'");
                Ok(false)
            },
        }
    }

    /// Paginated listing, newest first, optionally filtered by status.
    /// Returns the page of records and the total matching count.
    pub async fn list(
        &self,
        params: &PaginationParams,
        status: Option<FileStatus>,
    ) -> DbResult<(Vec<FileRecord>, i64)> {
        let (rows, total) = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {FILE_COLUMNS} FROM files WHERE status = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                );
                let rows = sqlx::query_as::<_, FileRow>(&sql)
                    .bind(status.as_str())
                    .bind(params.per_page())
                    .bind(params.offset())
                    .fetch_all(&self.pool)
                    .await?;

                let total: (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM files WHERE status = $1")
                        .bind(status.as_str())
                        .fetch_one(&self.pool)
                        .await?;

                (rows, total.0)
            },
            None => {
                let sql = format!(
                    "SELECT {FILE_COLUMNS} FROM files \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2"
                );
                let rows = sqlx::query_as::<_, FileRow>(&sql)
                    .bind(params.per_page())
                    .bind(params.offset())
                    .fetch_all(&self.pool)
                    .await?;

                let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
                    .fetch_one(&self.pool)
                    .await?;

                (rows, total.0)
            },
        };

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}
