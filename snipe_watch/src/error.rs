//! Error types for snipe_watch

use crate::reconcile::PassOutcome;
use mtg_common::CatalogError;
use std::time::Duration;
use thiserror::Error;

/// Rejected watch item or subscription input
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("card name must not be empty")]
    EmptyCardName,
    #[error("target price must be a positive number, got {0}")]
    InvalidTargetPrice(f64),
    #[error("a specific-print watch needs both set name and collector number")]
    MissingPrintDetails,
    #[error("subscription endpoint must be an http(s) URL: {0}")]
    InvalidEndpoint(String),
    #[error("subscription keys p256dh and auth must not be empty")]
    MissingSubscriptionKeys,
}

/// Persistence failures (fatal to a reconciliation pass)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed document {document}: {source}")]
    Parse {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Marketplace client failures
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// No usable access token
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),
}

/// Push delivery failures (never fatal to the caller)
#[derive(Debug, Error)]
pub enum PushError {
    /// The push service no longer knows this endpoint (404/410)
    #[error("Subscription expired: {0}")]
    Gone(String),
    #[error("Push service rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid subscription key: {0}")]
    InvalidKey(String),
    #[error("Payload encryption failed: {0}")]
    Encryption(String),
    #[error("VAPID signing failed: {0}")]
    Vapid(#[from] jsonwebtoken::errors::Error),
    #[error("Push configuration error: {0}")]
    Config(String),
}

/// Failures that abort a whole reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No usable marketplace token. `partial` holds what the pass had done
    /// when the token was lost mid-pass (None when it never started).
    #[error("Marketplace authentication failed: {source}")]
    Auth {
        #[source]
        source: MarketplaceError,
        partial: Option<Box<PassOutcome>>,
    },
    #[error("State store failure: {0}")]
    Store(#[from] StoreError),
}

/// Unified error type for snipe_watch operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Push error: {0}")]
    Push(#[from] PushError),
    #[error("Check failed: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type MarketplaceResult<T> = std::result::Result<T, MarketplaceError>;
pub type PushResult<T> = std::result::Result<T, PushError>;

/// Result alias for snipe_watch operations
pub type Result<T> = std::result::Result<T, Error>;
