//! Shared request validation
//!
//! Identifier format checks applied at the API boundary, before any
//! database lookup happens.

use ldp_common::ObjectId;
use thiserror::Error;

/// Error for a malformed identifier in a request path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid {field} format")]
pub struct IdValidationError {
    /// Name of the offending field as it appears in API errors
    /// (e.g. `fileId`, `jobId`)
    pub field: &'static str,
}

/// Validate that a path parameter is a well-formed 24-hex object id.
pub fn validate_object_id(value: &str, field: &'static str) -> Result<(), IdValidationError> {
    if ObjectId::is_valid(value) {
        Ok(())
    } else {
        Err(IdValidationError { field })
    }
}
