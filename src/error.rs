//! Error types for the payslip router.

use std::time::Duration;

use uuid::Uuid;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-document failures. Any of these is fatal to the call that hit it.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document could not be decoded: {0}")]
    Decode(String),

    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Failed to write document: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vision oracle failures. Always isolated to the page that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle {provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Send-contract failures. Always isolated to one recipient.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail backend {backend} send failed: {reason}")]
    SendFailed { backend: String, reason: String },

    #[error("Mail backend {backend} returned HTTP {status}: {body}")]
    Http {
        backend: String,
        status: u16,
        body: String,
    },
}

/// Process store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Process {id} not found or expired")]
    NotFound { id: Uuid },

    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the two pipeline entry points.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Dispatch workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("Extraction batch failed: {0}")]
    Batch(String),
}

impl PipelineError {
    /// True when the correlation id is unknown, expired or already consumed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::Store(StoreError::NotFound { .. }))
    }
}
