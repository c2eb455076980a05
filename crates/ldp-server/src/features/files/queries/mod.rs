//! Read operations for the files feature

pub mod get_file;
pub mod list_files;

pub use get_file::{GetFileError, GetFileQuery};
pub use list_files::{ListFilesError, ListFilesQuery, ListFilesResponse};
