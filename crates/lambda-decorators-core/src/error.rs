//! Error types for lambda-decorators.
//!
//! This module provides the [`InvocationError`] type, the "exception" that
//! flows through the decorator chain. Every transform either converts an
//! error into a [`Response`](crate::Response) at the point it detects the
//! condition, or lets it propagate outward to the next `on_exception` step
//! (or, ultimately, to the hosting runtime).
//!
//! # Taxonomy
//!
//! | Kind | Variant | Handling |
//! |---|---|---|
//! | Malformed input | `Validation` | converted to a 400 response by the detecting transform |
//! | Handler / internal | `Handler`, `Internal` | converted to a 500 response where a transform opts in |
//! | Operational signal | `DuplicateInvocation` | short-circuits the call, not a failure |
//! | Upstream dependency | `Store` | always propagated unconverted |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`InvocationError`].
pub type InvocationResult<T> = Result<T, InvocationError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input (unparseable body, request schema mismatch).
    Validation,
    /// Handler failures and internal errors (serialization, response schema).
    Internal,
    /// A redelivered invocation that was already seen by this process.
    Duplicate,
    /// Failures of an external dependency such as a parameter store.
    Upstream,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Error raised while invoking a (possibly decorated) handler.
///
/// # Example
///
/// ```
/// use lambda_decorators_core::{ErrorCategory, InvocationError};
///
/// let error = InvocationError::handler("barf");
/// assert_eq!(error.to_string(), "barf");
/// assert_eq!(error.category(), ErrorCategory::Internal);
/// ```
#[derive(Error, Debug)]
pub enum InvocationError {
    /// Inbound payload is malformed or fails validation.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// Internal failure inside a transform.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The request identifier was already processed by this process.
    #[error("Retry attempt on request id {request_id} detected.")]
    DuplicateInvocation {
        /// The repeated request identifier.
        request_id: String,
    },

    /// Fetching configuration from an external store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The wrapped handler itself failed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl InvocationError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a duplicate invocation signal.
    #[must_use]
    pub fn duplicate(request_id: impl Into<String>) -> Self {
        Self::DuplicateInvocation {
            request_id: request_id.into(),
        }
    }

    /// Creates a handler error from a plain message.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(anyhow::Error::msg(message.into()))
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Internal { .. } | Self::Handler(_) => ErrorCategory::Internal,
            Self::DuplicateInvocation { .. } => ErrorCategory::Duplicate,
            Self::Store(_) => ErrorCategory::Upstream,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns `true` for the duplicate-invocation signal.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateInvocation { .. })
    }
}

/// Errors returned by an external key-value parameter/secret store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The named parameter does not exist.
    #[error("parameter not found: {name}")]
    NotFound {
        /// The missing parameter name.
        name: String,
    },

    /// The store could not be reached or refused the request.
    #[error("parameter store unreachable: {message}")]
    Unreachable {
        /// Description of the connectivity failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an unreachable error.
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = InvocationError::validation("body is not JSON");
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(error.to_string().contains("body is not JSON"));
    }

    #[test]
    fn test_handler_error_is_transparent() {
        let error = InvocationError::handler("barf");
        assert_eq!(error.to_string(), "barf");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_handler_error_from_anyhow() {
        fn failing() -> InvocationResult<()> {
            Err(anyhow::anyhow!("disk on fire"))?;
            Ok(())
        }

        let error = failing().unwrap_err();
        assert!(matches!(error, InvocationError::Handler(_)));
        assert_eq!(error.to_string(), "disk on fire");
    }

    #[test]
    fn test_internal_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "broken pipe");
        let error = InvocationError::internal_with_source("write failed", io);
        assert_eq!(error.category(), ErrorCategory::Internal);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_duplicate_message() {
        let error = InvocationError::duplicate("abc-123");
        assert!(error.is_duplicate());
        assert_eq!(
            error.to_string(),
            "Retry attempt on request id abc-123 detected."
        );
    }

    #[test]
    fn test_store_error_propagates_as_upstream() {
        let error: InvocationError = StoreError::not_found("/app/secret").into();
        assert_eq!(error.category(), ErrorCategory::Upstream);
        assert_eq!(error.to_string(), "parameter not found: /app/secret");
    }

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::Validation,
            ErrorCategory::Internal,
            ErrorCategory::Duplicate,
            ErrorCategory::Upstream,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }
}
