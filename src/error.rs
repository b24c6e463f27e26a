//! Error types for glpidesk
//!
//! Every failure that leaves the client boundary can be classified into one
//! [`ErrorKind`]. UI callers should show [`NormalizedError::message`] and
//! never the upstream text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for glpidesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Closed error taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Network,
    Validation,
    Server,
    Permission,
    NotFound,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Fixed user-facing message for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "Your session has expired. Please sign in again.",
            ErrorKind::Network => {
                "Could not reach the support desk server. Check your connection and try again."
            }
            ErrorKind::Validation => "Some of the information provided is invalid.",
            ErrorKind::Server => "The support desk server had a problem. Please try again later.",
            ErrorKind::Permission => "You don't have permission to perform this action.",
            ErrorKind::NotFound => "The requested item was not found.",
            ErrorKind::Timeout => "The request took too long. Please try again.",
            ErrorKind::Unknown => "An unexpected error occurred.",
        }
    }

    /// Whether a caller may retry an operation that failed with this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Error record handed to the UI layer.
///
/// `message` is always the template for `kind`; the raw detail only lives
/// in `context` and the logs.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedError {
    fn new(kind: ErrorKind, context: &str, detail: &str) -> Self {
        log::warn!("[{}] {}: {}", kind, context, detail);
        Self {
            kind,
            message: kind.user_message().to_string(),
            context: context.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Top-level error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(e) => e.kind(),
            Error::Auth(e) => e.kind(),
            Error::Attach(e) => e.kind(),
            Error::Config(_) => ErrorKind::Validation,
            Error::Cache(_) | Error::Io(_) | Error::Json(_) => ErrorKind::Unknown,
        }
    }

    /// Convert into the record shown to users, logging the detail.
    pub fn normalize(&self, context: &str) -> NormalizedError {
        NormalizedError::new(self.kind(), context, &self.to_string())
    }
}

/// Request-level errors from the GLPI API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GLPI rejected the session token")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("No active session. Sign in to continue.")]
    NoSession,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized | ApiError::NoSession => ErrorKind::Auth,
            ApiError::Forbidden(_) => ErrorKind::Permission,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::ServerError { .. } => ErrorKind::Server,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Timeout | ApiError::Cancelled => ErrorKind::Timeout,
            ApiError::InvalidResponse(_) => ErrorKind::Unknown,
        }
    }

    pub fn normalize(&self, context: &str) -> NormalizedError {
        NormalizedError::new(self.kind(), context, &self.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to GLPI".to_string())
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Authentication failures.
///
/// Deliberately coarse: upstream detail is logged, not carried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    MalformedCredentials(&'static str),

    #[error("Sign-in was rejected. Check your username and password.")]
    Rejected,

    #[error("The authentication service is unavailable.")]
    Unavailable,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MalformedCredentials(_) => ErrorKind::Validation,
            AuthError::Rejected => ErrorKind::Auth,
            AuthError::Unavailable => ErrorKind::Network,
        }
    }
}

impl From<&ApiError> for AuthError {
    fn from(err: &ApiError) -> Self {
        match err.kind() {
            ErrorKind::Auth | ErrorKind::Permission | ErrorKind::Validation => AuthError::Rejected,
            _ => AuthError::Unavailable,
        }
    }
}

/// Failure of the upload-then-link sequence.
///
/// The two steps are reported separately so callers can tell the user the
/// file was stored but not attached.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] ApiError),

    #[error("Document {document_id} was uploaded but could not be linked: {source}")]
    LinkFailed {
        document_id: u64,
        #[source]
        source: ApiError,
    },
}

impl AttachError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttachError::UploadFailed(e) => e.kind(),
            AttachError::LinkFailed { source, .. } => source.kind(),
        }
    }

    /// Document left behind by a failed link step, if any.
    pub fn orphaned_document(&self) -> Option<u64> {
        match self {
            AttachError::LinkFailed { document_id, .. } => Some(*document_id),
            AttachError::UploadFailed(_) => None,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("GLPI API URL not configured. Set `api_url` or GLPI_API_URL.")]
    MissingApiUrl,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Cache persistence errors. Never escape the cache itself.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
