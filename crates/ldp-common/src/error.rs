//! Errors shared across the LDP workspace
//!
//! Currently covers configuration failures surfaced by the `from_env`
//! loaders. Messages carry a remediation hint so a failed startup is
//! diagnosable from the log line alone. Identifier parse failures live
//! next to the identifier type in [`crate::id`].

use thiserror::Error;

/// Shared error type for cross-crate failures
#[derive(Error, Debug)]
pub enum LdpError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {message}. {suggestion}")]
    Config { message: String, suggestion: String },
}

impl LdpError {
    /// Create a configuration error with a remediation hint
    pub fn config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_includes_suggestion() {
        let err = LdpError::config("PORT is not a number", "Set PORT to a value like 3000");
        assert!(err.to_string().contains("PORT is not a number"));
        assert!(err.to_string().contains("Set PORT"));
    }
}
