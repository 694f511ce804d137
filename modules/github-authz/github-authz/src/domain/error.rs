//! Domain errors for the GitHub `AuthZ` module.

use github_authz_sdk::IdentityProviderError;

use super::credential::CredentialError;

/// Why a check was denied.
///
/// Every failure of a check ends up as a deny; nothing is surfaced to the
/// caller as a transport-level error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Credential(#[from] CredentialError),

    #[error("invalid token: {0}")]
    InvalidToken(IdentityProviderError),

    #[error("{0}")]
    PermissionDenied(String),
}

impl From<IdentityProviderError> for DomainError {
    fn from(e: IdentityProviderError) -> Self {
        Self::InvalidToken(e)
    }
}

impl DomainError {
    #[must_use]
    pub fn code(&self) -> DenyCode {
        match self {
            Self::Credential(_) | Self::InvalidToken(_) => DenyCode::Unauthenticated,
            Self::PermissionDenied(_) => DenyCode::PermissionDenied,
        }
    }

    /// Whether the identity provider could not be consulted at all.
    #[must_use]
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::InvalidToken(e) if e.is_unavailable())
    }
}

/// Machine-readable deny classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyCode {
    Unauthenticated,
    PermissionDenied,
}

impl DenyCode {
    /// Name carried in the `error` field of the deny body.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::PermissionDenied => "PermissionDenied",
        }
    }

    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::PermissionDenied => 403,
        }
    }

    /// Canonical gRPC status code (`UNAUTHENTICATED` / `PERMISSION_DENIED`).
    #[must_use]
    pub fn grpc_code(self) -> tonic::Code {
        match self {
            Self::Unauthenticated => tonic::Code::Unauthenticated,
            Self::PermissionDenied => tonic::Code::PermissionDenied,
        }
    }
}
