//! Error types for the SimpleOperator controller
//!
//! API server failures are kept as `kube::Error` and classified on demand,
//! so the reconciler can branch on not-found, already-exists and
//! optimistic-concurrency conflicts without losing the original response.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Object is missing {0}")]
    MissingObjectKey(&'static str),
}

impl Error {
    fn api_response(&self) -> Option<&kube::error::ErrorResponse> {
        match self {
            Error::KubeError(kube::Error::Api(response)) => Some(response),
            _ => None,
        }
    }

    /// The target object does not exist (HTTP 404)
    pub fn is_not_found(&self) -> bool {
        self.api_response().is_some_and(|r| r.code == 404)
    }

    /// A create raced with another writer that created the same name first
    pub fn is_already_exists(&self) -> bool {
        self.api_response()
            .is_some_and(|r| r.code == 409 && r.reason == "AlreadyExists")
    }

    /// A write carried a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        self.api_response()
            .is_some_and(|r| r.code == 409 && r.reason == "Conflict")
    }

    /// Whether a later pass can be expected to succeed without operator action
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::KubeError(_) => true,
            Error::SerializationError(_) | Error::ConfigError(_) | Error::MissingObjectKey(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str, message: &str) -> Error {
    Error::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}
