use crate::cloud::HashAlgorithm;
use crate::pool::PoolError;

/// Coarse classification of a [`ProvisionError`], for callers that only need
/// to branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Upstream,
    Integrity,
    Transport,
    Pool,
    InvalidRequest,
}

/// Every failure an `ensure` call can surface. None of them is retried
/// internally.
#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    /// Well-formed negative lookup: no release, serial, artifact or checksum row.
    #[error("not found: {what} (at {location})")]
    NotFound { what: String, location: String },

    /// The remote source could not be reached or answered with a non-success status.
    #[error("upstream error for {url}: {reason}")]
    Upstream { url: String, reason: String },

    /// The downloaded bytes do not hash to the expected checksum.
    #[error("{algorithm} mismatch for {name}: expected {expected}, computed {computed}")]
    Integrity {
        name: String,
        algorithm: HashAlgorithm,
        expected: String,
        computed: String,
    },

    /// I/O failure while bytes were moving from the source into the pool.
    #[error("transport error while ingesting {name}: {reason}")]
    Transport { name: String, reason: String },

    /// The pool refused an operation outside of streaming.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::NotFound { .. } => ErrorKind::NotFound,
            ProvisionError::Upstream { .. } => ErrorKind::Upstream,
            ProvisionError::Integrity { .. } => ErrorKind::Integrity,
            ProvisionError::Transport { .. } => ErrorKind::Transport,
            ProvisionError::Pool(_) => ErrorKind::Pool,
            ProvisionError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>, location: impl Into<String>) -> Self {
        ProvisionError::NotFound {
            what: what.into(),
            location: location.into(),
        }
    }

    pub(crate) fn upstream(url: impl Into<String>, reason: impl ToString) -> Self {
        ProvisionError::Upstream {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Maps a failed `reqwest` call onto the upstream class; status errors
    /// and connection errors alike.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProvisionError::upstream(url, format!("HTTP {status}")),
            None => ProvisionError::upstream(url, err),
        }
    }
}
