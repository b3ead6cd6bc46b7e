//! Error types for the certificate registry.
//!
//! Library operations return [`RegistryError`] so callers can distinguish
//! input problems from authorization failures and collaborator outages.
//! Binary-level glue (config loading, server startup) uses `anyhow` instead.

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur in registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Required input is structurally malformed (e.g. empty wallet address)
    #[error("invalid input: {0}")]
    Validation(String),

    /// A certificate, course, or role assignment lookup came up empty
    /// where the operation needs it to proceed
    #[error("not found: {0}")]
    NotFound(String),

    /// The acting identity does not hold the required role
    #[error("not authorized: {0}")]
    Authorization(String),

    /// The operation would violate an immutable invariant
    /// (owner role change, identity-field mutation, un-revoke)
    #[error("policy violation: {0}")]
    Policy(String),

    /// The document store or content-addressing collaborator failed
    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl RegistryError {
    /// Stable machine-readable tag for the error category.
    ///
    /// The HTTP layer maps these onto status codes; clients match on them
    /// instead of parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Authorization(_) => "authorization",
            Self::Policy(_) => "policy",
            Self::Collaborator(_) => "collaborator",
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Collaborator(format!("serialization failed: {}", err))
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Collaborator(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(RegistryError::Validation("x".into()).kind(), "validation");
        assert_eq!(RegistryError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(
            RegistryError::Authorization("x".into()).kind(),
            "authorization"
        );
        assert_eq!(RegistryError::Policy("x".into()).kind(), "policy");
        assert_eq!(
            RegistryError::Collaborator("x".into()).kind(),
            "collaborator"
        );
    }
}
