//! `Authorization` header handling.

use github_authz_sdk::Credential;

/// Header carrying the bearer credential.
pub const AUTHORIZATION_HEADER: &str = "authorization";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing Authorization header")]
    Missing,

    #[error("invalid Authorization header format")]
    InvalidFormat,

    #[error("expected Bearer token, got {0}")]
    UnsupportedScheme(String),

    #[error("empty token")]
    Empty,
}

/// Find the `authorization` value in a header list, matching the name
/// case-insensitively. The first match wins.
#[must_use]
pub fn find_authorization<'a, I>(headers: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION_HEADER))
        .map(|(_, value)| value)
}

/// Parse `Bearer <token>`.
///
/// The scheme is matched case-insensitively and the token is trimmed.
///
/// # Errors
/// Returns a [`CredentialError`] describing the first violated rule.
pub fn parse_bearer(header: Option<&str>) -> Result<Credential, CredentialError> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err(CredentialError::Missing),
    };

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(CredentialError::InvalidFormat)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(CredentialError::UnsupportedScheme(scheme.to_owned()));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(CredentialError::Empty);
    }

    Ok(Credential::new(token))
}
