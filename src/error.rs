//! Error types for the bulkload import engine.
//!
//! - [`ConfigError`] - configuration and metadata errors that abort a run
//! - [`FetchError`] - remote/local resource fetch errors during file import
//!
//! Nothing in this hierarchy ever escapes [`crate::import::runner::run`]:
//! configuration failures become a single-error report, fetch failures are
//! recorded as validation errors on the row's record.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors caused by the caller's configuration or by a record type that
/// cannot be introspected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The record type exposes no attribute or relation metadata at all.
    #[error("Model '{0}' exposes no field or relation metadata")]
    NoMetadata(String),

    /// A relation field has no label accessor configured.
    #[error("No label accessor configured for relation field '{0}'")]
    MissingLabelAccessor(String),

    /// A relation field points at a model the metadata provider does not know.
    #[error("No related model registered for relation field '{0}'")]
    UnknownRelation(String),
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors while fetching a file-field resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to construct the HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The HTTP request itself failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    /// Local file read failed.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration-sensitive operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
