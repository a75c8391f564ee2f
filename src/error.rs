/// Errors surfaced by [`SessionController`](crate::SessionController) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Credentials rejected by the login or register endpoint.
    #[error("authentication failed ({status}): {detail}")]
    Authentication { status: u16, detail: String },

    /// The backend no longer accepts the session token.
    #[error("session token rejected by backend")]
    InvalidToken,

    /// Network or server failure. Local session state was preserved.
    #[error("backend unavailable: {0}")]
    Transient(String),

    /// Credential store read/write failure.
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure reported by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store contents: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failure at the backend seam, before classification.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by an endpoint.
    #[error("{operation} failed with status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// Response body did not match the expected shape.
    #[error("{operation} returned an unexpected body: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    /// Transport failure from a non-HTTP backend.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

impl BackendError {
    /// HTTP status code, if the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            #[cfg(feature = "http")]
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// `true` only for a literal 401. A 403 is deliberately not included.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// `true` when the backend rejected the submitted credentials (400 or 401).
    #[must_use]
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self.status(), Some(400 | 401))
    }

    pub(crate) fn detail(&self) -> String {
        match self {
            Self::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
