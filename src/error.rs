// Client error types
use std::fmt;
use thiserror::Error;

use crate::types::ObjectKey;

/// Errors returned by object-store clients
#[derive(Debug, Error)]
pub enum ClientError {
    // Resource state
    #[error("{kind} \"{key}\" not found")]
    NotFound { kind: String, key: ObjectKey },

    #[error("{kind} \"{key}\" already exists")]
    AlreadyExists { kind: String, key: ObjectKey },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid object: {0}")]
    Invalid(String),

    // Type resolution
    #[error("No kind is registered for the type {0}")]
    NotRegistered(String),

    #[error("Failed to snapshot created object: {message}")]
    Snapshot {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    // Call context
    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    pub fn not_found(kind: impl Into<String>, key: ObjectKey) -> Self {
        ClientError::NotFound { kind: kind.into(), key }
    }

    pub fn already_exists(kind: impl Into<String>, key: ObjectKey) -> Self {
        ClientError::AlreadyExists { kind: kind.into(), key }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ClientError::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ClientError::Invalid(message.into())
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        ClientError::Snapshot { message: message.into(), source: None }
    }

    /// Snapshot failure caused by a JSON conversion, kept as the source
    pub fn snapshot_json(message: impl Into<String>, source: serde_json::Error) -> Self {
        ClientError::Snapshot {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict(_))
    }

    /// Cancellation or deadline, i.e. the call never reached the store
    pub fn is_context_error(&self) -> bool {
        matches!(self, ClientError::Cancelled | ClientError::DeadlineExceeded)
    }
}

/// Several independent failures reported as one error.
///
/// Messages are joined with `"; "` in the order they occurred and the first
/// failure is exposed as the `source()`.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<ClientError>,
}

impl AggregateError {
    /// Returns `None` for an empty list so callers can map straight to `Ok(())`
    pub fn from_errors(errors: Vec<ClientError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[ClientError] {
        &self.errors
    }

    pub fn first(&self) -> &ClientError {
        &self.errors[0]
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<ClientError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors.first().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
