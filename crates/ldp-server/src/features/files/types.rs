//! File catalog types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an uploaded file
///
/// Status only ever advances `uploaded` → `processed`; the catalog refuses
/// regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    Processed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Processed => "processed",
        }
    }

    /// Parse a status filter value from a query string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(FileStatus::Uploaded),
            "processed" => Some(FileStatus::Processed),
            _ => None,
        }
    }
}

impl From<String> for FileStatus {
    fn from(s: String) -> Self {
        FileStatus::parse(&s).unwrap_or(FileStatus::Uploaded)
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded blob in the object store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    /// Immutable object-store key
    pub object_key: String,
    /// Client-supplied filename
    pub original_name: String,
    /// Exact byte count observed while streaming to the store
    pub size_bytes: i64,
    pub content_type: String,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
}

/// Raw database row for a file record
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    pub id: String,
    pub object_key: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            id: row.id,
            object_key: row.object_key,
            original_name: row.original_name,
            size_bytes: row.size_bytes,
            content_type: row.content_type,
            status: FileStatus::from(row.status),
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(FileStatus::parse("uploaded"), Some(FileStatus::Uploaded));
        assert_eq!(FileStatus::parse("processed"), Some(FileStatus::Processed));
        assert_eq!(FileStatus::parse("bogus"), None);
        assert_eq!(FileStatus::Processed.as_str(), "processed");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&FileStatus::Uploaded).unwrap();
        assert_eq!(json, "\"uploaded\"");
    }
}
