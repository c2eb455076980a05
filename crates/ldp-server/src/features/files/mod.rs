//! Files feature: the file catalog and the streaming upload pipeline
//!
//! The catalog owns every mutation of file records; the upload command is
//! the only ingest path and never buffers a whole request body.

pub mod catalog;
pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use catalog::FileCatalog;
pub use types::{FileRecord, FileStatus};
