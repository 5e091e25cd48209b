//! Error types for the IMDb scraper
//!
//! This module defines all error types used throughout the library.
//! ImdbError implements Serialize so results can cross process or IPC
//! boundaries as plain strings.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for IMDb scraper operations
#[derive(Error, Debug)]
pub enum ImdbError {
    /// HTTP client construction or stream failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Headless browser launch or protocol failure
    #[error("Browser failure: {0}")]
    Browser(String),

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    Parse(String),

    /// Filesystem failure while saving or loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Title ID does not match the `tt<digits>` form
    #[error("Invalid title ID: {0}")]
    InvalidTitleId(String),
}

/// Serialize ImdbError as its display string
impl Serialize for ImdbError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for IMDb scraper operations
pub type Result<T> = std::result::Result<T, ImdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imdb_error_display_parse() {
        let error = ImdbError::Parse("invalid HTML".to_string());
        let display = error.to_string();
        assert!(!display.is_empty());
        assert!(display.contains("invalid HTML"));
    }

    #[test]
    fn test_imdb_error_display_browser() {
        let error = ImdbError::Browser("chrome executable not found".to_string());
        assert_eq!(
            error.to_string(),
            "Browser failure: chrome executable not found"
        );
    }

    #[test]
    fn test_imdb_error_display_invalid_title_id() {
        let error = ImdbError::InvalidTitleId("breaking-bad".to_string());
        assert_eq!(error.to_string(), "Invalid title ID: breaking-bad");
    }

    #[test]
    fn test_imdb_error_display_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let error = ImdbError::from(io);
        assert!(error.to_string().starts_with("I/O error:"));
        assert!(error.to_string().contains("missing.json"));
    }

    #[test]
    fn test_imdb_error_serialize() {
        let error = ImdbError::Parse("test error".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "\"Failed to parse HTML: test error\"");
    }

    #[test]
    fn test_imdb_error_serialize_invalid_title_id() {
        let error = ImdbError::InvalidTitleId("tt".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "\"Invalid title ID: tt\"");
    }

    #[test]
    fn test_imdb_error_serialize_browser() {
        let error = ImdbError::Browser("handler exited".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "\"Browser failure: handler exited\"");
    }

    #[test]
    fn test_imdb_error_from_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ImdbError::from(parse_err);
        assert!(error.to_string().starts_with("JSON error:"));
    }
}
