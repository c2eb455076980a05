//! LDP Common Library
//!
//! Shared utilities used across the LDP workspace:
//!
//! - **Error handling**: the shared [`LdpError`] type
//! - **Logging**: centralized tracing initialization with console/file output
//! - **Identifiers**: opaque 24-hex-character object identifiers

pub mod error;
pub mod id;
pub mod logging;

pub use error::LdpError;
pub use id::ObjectId;
