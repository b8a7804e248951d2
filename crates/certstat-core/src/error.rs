//! Error types for the certstat core library.

use thiserror::Error;

/// Core error type for certstat.
#[derive(Error, Debug)]
pub enum CertStatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Couldn't find __RequestVerificationToken on page")]
    TokenNotFound,

    #[error("Checker returned {status}: {message}")]
    CheckerStatus { status: u16, message: String },

    #[error("Invalid provisioning profile: {0}")]
    InvalidProfile(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for certstat operations.
pub type Result<T> = std::result::Result<T, CertStatError>;
