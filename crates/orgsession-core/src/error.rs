//! Unified application error types for OrgSession.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The parent instance has not completed sign-in.
    NotSignedIn,
    /// The organization is not in the parent's list of available organizations.
    InvalidOrganization,
    /// An active session already exists for the organization.
    AlreadyExists,
    /// The parent instance never became ready (timed out, failed, or stale).
    ParentUnavailable,
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A durable storage backend failed.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An external collaborator (token exchange, identity provider) failed.
    ExternalService,
    /// An outbound HTTP request failed or returned an error status.
    Http,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Remediation hint for error kinds a caller is expected to act on.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotSignedIn => {
                Some("Sign in to the parent organization before registering a sub-organization.")
            }
            Self::InvalidOrganization => Some(
                "Pick an organization from the parent's available organizations list.",
            ),
            Self::AlreadyExists => Some(
                "Unregister the existing sub-organization session before registering it again.",
            ),
            Self::ParentUnavailable => {
                Some("Make sure the parent instance is mounted and finishes signing in.")
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSignedIn => write!(f, "NOT_SIGNED_IN"),
            Self::InvalidOrganization => write!(f, "INVALID_ORGANIZATION"),
            Self::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            Self::ParentUnavailable => write!(f, "PARENT_UNAVAILABLE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Http => write!(f, "HTTP"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout OrgSession.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire library boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-signed-in error.
    pub fn not_signed_in(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSignedIn, message)
    }

    /// Create an invalid-organization error.
    pub fn invalid_organization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOrganization, message)
    }

    /// Create an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    /// Create a parent-unavailable error.
    pub fn parent_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParentUnavailable, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external-service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Http, message)
    }

    /// Create a cancelled error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Remediation hint for this error, if its kind carries one.
    pub fn hint(&self) -> Option<&'static str> {
        self.kind.hint()
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(
            ErrorKind::Validation,
            format!("Invalid configuration: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_kinds_carry_hints() {
        assert!(AppError::not_signed_in("x").hint().is_some());
        assert!(AppError::invalid_organization("x").hint().is_some());
        assert!(AppError::already_exists("x").hint().is_some());
        assert!(AppError::storage("x").hint().is_none());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::already_exists("org-1 is active");
        assert_eq!(err.to_string(), "ALREADY_EXISTS: org-1 is active");
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("disk gone");
        let err: AppError = io.into();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(err.source.is_some());
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::Storage);
        assert!(cloned.source.is_none());
    }
}
