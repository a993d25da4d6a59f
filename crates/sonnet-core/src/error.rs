//! Error types for sonnet-core

use std::fmt;

use thiserror::Error;

/// Result type alias using sonnet-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of a reconciliation an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// The embedded local store
    Local,
    /// The remote store of record
    Remote,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Errors that can occur in sonnet-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No active owner for the requested operation
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Reading a snapshot from one of the stores failed
    #[error("Failed to fetch {store} snapshot: {message}")]
    FetchFailure { store: StoreKind, message: String },

    /// Writing a single document failed
    #[error("Failed to write document {document_id}: {message}")]
    WriteFailure {
        document_id: String,
        message: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document or log not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parent document missing, deleted, or would create a cycle
    #[error("Invalid parent document: {0}")]
    InvalidParent(String),

    /// Document belongs to another owner
    #[error("Not permitted")]
    NotPermitted,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote store rejected a request
    #[error("Remote store error: {0}")]
    Remote(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Wrap any error raised while reading a snapshot.
    pub fn fetch(store: StoreKind, source: &Self) -> Self {
        match source {
            Self::NotAuthenticated => Self::NotAuthenticated,
            other => Self::FetchFailure {
                store,
                message: other.to_string(),
            },
        }
    }

    /// Wrap any error raised while writing one document.
    pub fn write(document_id: impl fmt::Display, source: &Self) -> Self {
        Self::WriteFailure {
            document_id: document_id.to_string(),
            message: source.to_string(),
        }
    }
}
