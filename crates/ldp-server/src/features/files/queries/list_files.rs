//! List files query
//!
//! Paginated file-catalog listing, newest first, optionally filtered by
//! lifecycle status.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::features::files::{FileCatalog, FileRecord, FileStatus};
use crate::features::shared::pagination::{PaginationMeta, PaginationParams};

/// Query parameters for listing files
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListFilesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Optional status filter: `uploaded` or `processed`
    pub status: Option<String>,
}

/// Page of file records
#[derive(Debug, Clone, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileRecord>,
    pub pagination: PaginationMeta,
}

/// Error type for the list files query
#[derive(Debug, thiserror::Error)]
pub enum ListFilesError {
    #[error("status must be 'uploaded' or 'processed'")]
    InvalidStatus,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<ListFilesResponse, ListFilesError>> for ListFilesQuery {}

pub async fn handle(
    catalog: &FileCatalog,
    query: ListFilesQuery,
) -> Result<ListFilesResponse, ListFilesError> {
    let status = match &query.status {
        Some(raw) => Some(FileStatus::parse(raw).ok_or(ListFilesError::InvalidStatus)?),
        None => None,
    };

    let params = PaginationParams::new(query.page, query.per_page);
    let (files, total) = catalog.list(&params, status).await?;

    Ok(ListFilesResponse {
        pagination: PaginationMeta::new(params.page(), params.per_page(), total),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserializes_from_url_params() {
        let query: ListFilesQuery =
            serde_json::from_str(r#"{"page": 2, "per_page": 10, "status": "uploaded"}"#).unwrap();
        assert_eq!(query.page, Some(2));
        assert_eq!(query.per_page, Some(10));
        assert_eq!(query.status.as_deref(), Some("uploaded"));
    }
}
