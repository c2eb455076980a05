//! Get file query

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::features::files::{FileCatalog, FileRecord};
use crate::features::shared::validation::validate_object_id;

/// Query to fetch one file record by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFileQuery {
    pub file_id: String,
}

/// Error type for the get file query
#[derive(Debug, thiserror::Error)]
pub enum GetFileError {
    #[error("Invalid fileId format")]
    InvalidId,
    #[error("File not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<FileRecord, GetFileError>> for GetFileQuery {}

pub async fn handle(catalog: &FileCatalog, query: GetFileQuery) -> Result<FileRecord, GetFileError> {
    validate_object_id(&query.file_id, "fileId").map_err(|_| GetFileError::InvalidId)?;

    catalog
        .get(&query.file_id)
        .await?
        .ok_or(GetFileError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id_error_message() {
        assert_eq!(GetFileError::InvalidId.to_string(), "Invalid fileId format");
    }
}
