//! Error types for the identity provider API.

use thiserror::Error;

/// Errors that can occur when calling the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityProviderError {
    /// The provider rejected the credential (any non-success status).
    ///
    /// Carries the raw status line, e.g. `401 Unauthorized`.
    #[error("GitHub API error: {0}")]
    Unauthorized(String),

    /// The provider could not be reached or its answer could not be decoded.
    #[error("{0}")]
    Unavailable(String),
}

impl IdentityProviderError {
    /// Whether this error means the provider could not be consulted at all.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
