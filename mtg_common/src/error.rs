//! Error types for catalog lookups

use thiserror::Error;

/// Errors returned by the Scryfall catalog client
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (network error, timeout, body decoding)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Failed to parse a JSON body
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Scryfall answered with its structured error object
    #[error("{code}: {details}")]
    Api { code: String, details: String },
    /// Non-success status without a readable error body
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
}

impl CatalogError {
    /// True when Scryfall reported that nothing matched the lookup
    pub fn is_not_found(&self) -> bool {
        match self {
            CatalogError::Api { code, .. } => code == "not_found",
            CatalogError::HttpStatus(status) => *status == reqwest::StatusCode::NOT_FOUND,
            _ => false,
        }
    }
}

/// Result alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
