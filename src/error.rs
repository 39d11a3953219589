//! Error types for `FastSearch`

use std::path::PathBuf;

use arrayvec::ArrayString;
use thiserror::Error;

use crate::types::MAX_RESULTS_LIMIT;

/// Maximum length of user-facing error messages
pub const MAX_ERROR_LENGTH: usize = 256;

/// Custom result type for `FastSearch` operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for `FastSearch`
///
/// # Design
/// - Only problems detected before the walk starts are reported here
/// - I/O failures on individual files or directories are logged and skipped
#[derive(Debug, Error)]
pub enum Error {
    /// Query could not be compiled into a pattern
    #[error("Error: Invalid query: {0}")]
    InvalidQuery(#[from] regex::Error),

    /// Request parameters are out of range
    #[error("Error: {0}")]
    InvalidRequest(String),

    /// Configuration file could not be loaded
    #[error("Error: Failed to load config {}: {reason}", path.display())]
    Config {
        /// Path of the offending file
        path:   PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Worker pool could not be started
    #[error("Error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Create a new request error
    pub fn request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Get a user-friendly error message with action items
    #[must_use]
    pub fn user_message(&self) -> ArrayString<MAX_ERROR_LENGTH> {
        let mut msg = ArrayString::new();
        let tip = match self {
            Self::InvalidQuery(_) => {
                "\nTip: Escape special characters or turn off regex mode for literal text"
            },
            Self::InvalidRequest(_) => "\nTip: Check the search options and try again",
            Self::Config { .. } => "\nTip: Fix or remove the config file to use the defaults",
            Self::ThreadPool(_) => "\nTip: The system may be low on resources",
        };
        // Leave room for the tip, truncating the detail if needed
        for c in self.to_string().chars() {
            if msg.len() + c.len_utf8() + tip.len() > MAX_ERROR_LENGTH {
                break;
            }
            msg.push(c);
        }
        let _ = msg.try_push_str(tip);
        msg
    }
}

/// Validate a result cap against the allowed range
pub fn validate_max_results(max_results: usize) -> Result<()> {
    if max_results == 0 {
        return Err(Error::request("Maximum results must be at least 1"));
    }
    if max_results > MAX_RESULTS_LIMIT {
        return Err(Error::request(format!(
            "Maximum results must not exceed {MAX_RESULTS_LIMIT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_max_results() {
        assert!(validate_max_results(1).is_ok());
        assert!(validate_max_results(MAX_RESULTS_LIMIT).is_ok());
        assert!(matches!(validate_max_results(0), Err(Error::InvalidRequest(_))));
        assert!(matches!(
            validate_max_results(MAX_RESULTS_LIMIT + 1),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_user_message_has_tip() {
        let err = regex::Regex::new("(").unwrap_err();
        let msg = Error::from(err).user_message();
        assert!(msg.starts_with("Error: Invalid query"));
        assert!(msg.contains("Tip:"));
    }

    #[test]
    fn test_config_error_names_file() {
        let err = Error::Config { path: PathBuf::from("/tmp/settings.json"), reason: "bad".into() };
        let msg = err.user_message();
        assert!(msg.starts_with("Error: Failed to load config /tmp/settings.json: bad"));
        assert!(msg.ends_with("Tip: Fix or remove the config file to use the defaults"));
    }

    #[test]
    fn test_user_message_is_bounded() {
        let err = Error::request("x".repeat(MAX_ERROR_LENGTH * 2));
        let msg = err.user_message();
        assert!(msg.len() <= MAX_ERROR_LENGTH);
        assert!(msg.ends_with("Tip: Check the search options and try again"));
    }
}
