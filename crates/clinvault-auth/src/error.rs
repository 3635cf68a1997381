//! Security-core error types.
//!
//! The taxonomy keeps the failure classes callers must tell apart distinct:
//! a token whose signature does not verify is tampered input and never a
//! "not found"; a missing or expired session is recoverable by
//! re-authenticating; a denied policy is expected control flow; a broken
//! signing configuration is fatal at startup.

use std::fmt;

/// Errors that can occur during session and policy operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A presented token failed signature verification.
    ///
    /// The token's identifier bytes were never trusted or looked up.
    #[error("Token tampered: {message}")]
    TokenTampered {
        /// Description of the integrity failure.
        message: String,
    },

    /// The session (or refresh token) is absent or past its validity window.
    #[error("Session not found or expired")]
    SessionNotFound,

    /// The operation requires an authenticated principal.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Description of why the principal was rejected.
        message: String,
    },

    /// A claim required by the operation is not present on the principal.
    #[error("Missing required claim: {claim_type}")]
    MissingClaim {
        /// The claim type URI that was required.
        claim_type: String,
    },

    /// A claim value is malformed or rejected by its type handler.
    #[error("Invalid claim {claim_type}: {message}")]
    InvalidClaim {
        /// The claim type URI.
        claim_type: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// A principal already carries an identity of the given actor category.
    #[error("Duplicate identity for actor type: {actor_type}")]
    DuplicateIdentity {
        /// The actor type category that collided.
        actor_type: String,
    },

    /// The principal does not hold the required policy.
    #[error("Access denied: policy {policy_oid}")]
    AccessDenied {
        /// The policy OID that was demanded.
        policy_oid: String,
    },

    /// A referenced policy OID does not exist in the policy registry.
    #[error("Policy not found: {oid}")]
    PolicyNotFound {
        /// The missing policy OID.
        oid: String,
    },

    /// Policies cannot be assigned to or removed from this securable kind.
    #[error("Policies are not supported for securable: {category}")]
    UnsupportedSecurable {
        /// The securable category name.
        category: String,
    },

    /// An error occurred while storing or retrieving security data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The security configuration is invalid or unusable.
    ///
    /// Configuration errors are fatal: the service refuses to start rather
    /// than operate without a usable signing key.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `TokenTampered` error.
    #[must_use]
    pub fn token_tampered(message: impl Into<String>) -> Self {
        Self::TokenTampered {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a new `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim_type: impl Into<String>) -> Self {
        Self::MissingClaim {
            claim_type: claim_type.into(),
        }
    }

    /// Creates a new `InvalidClaim` error.
    #[must_use]
    pub fn invalid_claim(claim_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClaim {
            claim_type: claim_type.into(),
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error carrying the demanded OID.
    #[must_use]
    pub fn access_denied(policy_oid: impl Into<String>) -> Self {
        Self::AccessDenied {
            policy_oid: policy_oid.into(),
        }
    }

    /// Creates a new `PolicyNotFound` error.
    #[must_use]
    pub fn policy_not_found(oid: impl Into<String>) -> Self {
        Self::PolicyNotFound { oid: oid.into() }
    }

    /// Creates a new `UnsupportedSecurable` error.
    #[must_use]
    pub fn unsupported_securable(category: impl Into<String>) -> Self {
        Self::UnsupportedSecurable {
            category: category.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error indicates tampered input.
    #[must_use]
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::TokenTampered { .. })
    }

    /// Returns `true` if this error indicates an absent or expired record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound | Self::PolicyNotFound { .. })
    }

    /// Returns `true` if the caller can recover (typically by
    /// re-authenticating or correcting the request).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TokenTampered { .. }
                | Self::SessionNotFound
                | Self::Unauthenticated { .. }
                | Self::MissingClaim { .. }
                | Self::InvalidClaim { .. }
                | Self::DuplicateIdentity { .. }
                | Self::AccessDenied { .. }
                | Self::PolicyNotFound { .. }
                | Self::UnsupportedSecurable { .. }
        )
    }

    /// Returns `true` if this is a server-side fault.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging and monitoring.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TokenTampered { .. } => ErrorCategory::Integrity,
            Self::SessionNotFound => ErrorCategory::NotFound,
            Self::Unauthenticated { .. } => ErrorCategory::Authentication,
            Self::MissingClaim { .. } => ErrorCategory::Validation,
            Self::InvalidClaim { .. } => ErrorCategory::Validation,
            Self::DuplicateIdentity { .. } => ErrorCategory::Validation,
            Self::AccessDenied { .. } => ErrorCategory::Authorization,
            Self::PolicyNotFound { .. } => ErrorCategory::NotFound,
            Self::UnsupportedSecurable { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of security-core errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Signature verification failures on presented tokens.
    Integrity,
    /// Absent or expired records.
    NotFound,
    /// Identity verification errors.
    Authentication,
    /// Permission check failures.
    Authorization,
    /// Request or claim validation errors.
    Validation,
    /// Storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integrity => write!(f, "integrity"),
            Self::NotFound => write!(f, "not-found"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
