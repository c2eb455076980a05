//! Write operations for the files feature

pub mod upload;

pub use upload::{UploadFileCommand, UploadFileError, UploadFileResponse};
