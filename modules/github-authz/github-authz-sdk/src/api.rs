//! Public API trait for the identity provider.
//!
//! The authorization module consumes this trait to turn a bearer credential
//! into a resolved identity. The production implementation talks to the
//! GitHub REST API; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::IdentityProviderError;
use crate::models::{Credential, Identity, Organization};

/// Identity provider API.
///
/// Every call authenticates to the provider with the credential itself.
/// Implementations must not outlive the caller's future: dropping the
/// returned future aborts the outbound request.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Resolve the identity that owns the credential ("who is this").
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the provider answers with a non-success status
    /// - `Unavailable` on transport or decoding failure
    async fn resolve_identity(
        &self,
        credential: &Credential,
    ) -> Result<Identity, IdentityProviderError>;

    /// Resolve the organizations the credential's identity belongs to,
    /// in the order reported by the provider.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the provider answers with a non-success status
    /// - `Unavailable` on transport or decoding failure
    async fn resolve_memberships(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Organization>, IdentityProviderError>;
}
