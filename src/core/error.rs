use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, serializable classification of everything that can go wrong in a
/// harvest. Front ends map these onto exit codes / HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NavigationTimeout,
    SurfaceNotFound,
    AccessBlocked,
    ParseFailure,
    SessionError,
    NavigationFailed,
    InvalidRequest,
}

impl ErrorKind {
    /// Fatal kinds abort the harvest with zero records; the rest are
    /// recorded as warnings and the run continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::AccessBlocked
                | ErrorKind::SessionError
                | ErrorKind::NavigationFailed
                | ErrorKind::InvalidRequest
        )
    }
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("navigation did not finish within {timeout_ms}ms")]
    NavigationTimeout { timeout_ms: u64 },

    #[error("review surface not found: {0}")]
    SurfaceNotFound(String),

    #[error("access blocked by storefront (signature {signature:?} persisted past the recovery window)")]
    AccessBlocked { signature: String },

    #[error("card {index} on page {page}: missing {missing}")]
    ParseFailure {
        page: u32,
        index: usize,
        missing: String,
    },

    #[error("browser session error: {0}")]
    Session(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl HarvestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarvestError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            HarvestError::SurfaceNotFound(_) => ErrorKind::SurfaceNotFound,
            HarvestError::AccessBlocked { .. } => ErrorKind::AccessBlocked,
            HarvestError::ParseFailure { .. } => ErrorKind::ParseFailure,
            HarvestError::Session(_) => ErrorKind::SessionError,
            HarvestError::NavigationFailed(_) => ErrorKind::NavigationFailed,
            HarvestError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Configuration loading errors. Only raised when a caller asks for strict
/// loading; the default loader logs and falls back to defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid selector for `{field}`: {selector:?}")]
    InvalidSelector { field: &'static str, selector: String },
}
