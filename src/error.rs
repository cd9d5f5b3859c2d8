//! Error types for the Storage Pool Provisioner
//!
//! Provides structured error types for request validation, topology lookups,
//! the cluster control API client and storage entity persistence.

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Request Validation Errors
    // =========================================================================
    #[error("Request validation failed: {0}")]
    Validation(String),

    #[error("Capacity parse error: {0}")]
    CapacityParse(String),

    // =========================================================================
    // Topology Errors
    // =========================================================================
    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("No mons available for cluster {cluster_id}")]
    NoMonitorsAvailable { cluster_id: String },

    #[error("Topology store error: {0}")]
    Store(String),

    // =========================================================================
    // Cluster Control API Errors
    // =========================================================================
    #[error("Failed to submit {operation} to cluster: {reason}")]
    RemoteSubmit { operation: String, reason: String },

    #[error("Error parsing {operation} response data: {reason}")]
    RemoteDecode { operation: String, reason: String },

    #[error("Error syncing status of request {request_id} from cluster: {reason}")]
    RemotePoll { request_id: String, reason: String },

    #[error("Request {request_id} not complete after {attempts} polls ({elapsed:?})")]
    TimedOut {
        request_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    #[error("Failed to persist storage entity: {0}")]
    Persistence(String),

    // =========================================================================
    // Parse / IO Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status code reported to API callers for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::CapacityParse(_) => StatusCode::BAD_REQUEST,
            Error::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Error::NoMonitorsAvailable { .. } => StatusCode::CONFLICT,
            Error::RemoteSubmit { .. }
            | Error::RemoteDecode { .. }
            | Error::RemotePoll { .. } => StatusCode::BAD_GATEWAY,
            Error::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable label for this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Internal(_) => "internal_error",
            Error::Configuration(_) => "configuration_error",
            Error::Validation(_) | Error::CapacityParse(_) => "validation_error",
            Error::ResourceNotFound { .. } => "not_found",
            Error::NoMonitorsAvailable { .. } => "no_monitors_available",
            Error::Store(_) => "store_error",
            Error::RemoteSubmit { .. } => "remote_submit_error",
            Error::RemoteDecode { .. } => "remote_decode_error",
            Error::RemotePoll { .. } => "remote_poll_error",
            Error::TimedOut { .. } => "timed_out",
            Error::Persistence(_) => "persistence_error",
            Error::JsonParse(_) | Error::YamlParse(_) => "parse_error",
            Error::Io(_) => "io_error",
        }
    }

    /// Check if this error was raised before any work was dispatched
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::CapacityParse(_))
    }

    /// Check if this error came from the remote cluster control API
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::RemoteSubmit { .. }
                | Error::RemoteDecode { .. }
                | Error::RemotePoll { .. }
                | Error::TimedOut { .. }
        )
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = Error::Validation("bad quota".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = Error::ResourceNotFound {
            kind: "Cluster".into(),
            name: "c1".into(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = Error::RemoteSubmit {
            operation: "CreatePool".into(),
            reason: "HTTP 500".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = Error::TimedOut {
            request_id: "r1".into(),
            attempts: 3,
            elapsed: Duration::from_secs(6),
        };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::CapacityParse("x".into()).is_validation());
        assert!(!Error::Persistence("down".into()).is_validation());

        let remote = Error::RemotePoll {
            request_id: "r1".into(),
            reason: "connection reset".into(),
        };
        assert!(remote.is_remote());
        assert_eq!(remote.kind(), "remote_poll_error");
        assert!(!Error::Store("down".into()).is_remote());
    }
}
