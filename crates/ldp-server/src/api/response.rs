//! API response types
//!
//! Error bodies are flat `{error, message?}` JSON objects; success bodies
//! are endpoint-specific. Stack traces and internal details never reach
//! clients; handlers log them and send a generic message instead.

use serde::Serialize;

/// Standard error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Create an error body with just the short error label
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    /// Create an error body with a human-readable detail message
    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_omits_absent_message() {
        let body = ErrorBody::new("File not found");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "File not found"}));
    }

    #[test]
    fn test_error_body_includes_message() {
        let body = ErrorBody::with_message("Upload failed", "disk on fire");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "Upload failed");
        assert_eq!(json["message"], "disk on fire");
    }
}
