//! Error types for the Neo4j adapter.

use cdc_core::FeedError;
use thiserror::Error;

/// Errors that can occur talking to Neo4j.
#[derive(Error, Debug)]
pub enum Neo4jCdcError {
    /// Neo4j database error
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    /// A CDC row could not be decoded
    #[error("Failed to decode column '{column}': {reason}")]
    Decode { column: &'static str, reason: String },

    /// Label is not a plain identifier
    #[error("Invalid label '{0}'")]
    InvalidLabel(String),
}

impl From<Neo4jCdcError> for FeedError {
    fn from(err: Neo4jCdcError) -> Self {
        match err {
            Neo4jCdcError::Neo4j(e) => classify(e.to_string()),
            other => FeedError::Backend(other.to_string()),
        }
    }
}

/// Map a server message to a feed error. Neo4j reports retryable
/// failures with status codes under `Neo.TransientError`.
pub(crate) fn classify(message: String) -> FeedError {
    if message.contains("TransientError") {
        FeedError::Transient(message)
    } else {
        FeedError::Backend(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_code() {
        let err = classify(
            "Neo.TransientError.Transaction.DeadlockDetected: lock cycle".to_string(),
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_errors_are_backend() {
        let err = classify("Neo.ClientError.Procedure.ProcedureNotFound".to_string());
        assert!(matches!(err, FeedError::Backend(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_label_is_backend() {
        let err: FeedError = Neo4jCdcError::InvalidLabel("a b".to_string()).into();
        assert_eq!(err, FeedError::Backend("Invalid label 'a b'".to_string()));
    }
}
