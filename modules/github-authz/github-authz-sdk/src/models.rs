//! Domain models for the `github_authz` module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque bearer credential presented by a caller.
///
/// Used verbatim as the upstream bearer token and as the cache key.
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value, for building the upstream `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A resolved user.
///
/// `login` preserves the provider's casing; comparisons against configured
/// names are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable username.
    pub login: String,
    /// Numeric user identifier.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public email.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An organization the identity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization name.
    pub login: String,
    /// Numeric organization identifier.
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Organization names an identity belongs to, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipSet(Vec<String>);

impl MembershipSet {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Empty set, used when memberships could not be resolved.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the identity is a member of `org` (case-insensitive).
    #[must_use]
    pub fn contains(&self, org: &str) -> bool {
        self.0.iter().any(|name| eq_ignore_case(name, org))
    }

    /// First entry of `allowed` (in `allowed` order) the identity is a member of.
    #[must_use]
    pub fn first_member_of<'a, I>(&self, allowed: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        allowed
            .into_iter()
            .map(String::as_str)
            .find(|org| self.contains(org))
    }

    /// Comma-joined names, as projected into downstream headers.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl From<Vec<Organization>> for MembershipSet {
    fn from(orgs: Vec<Organization>) -> Self {
        Self(orgs.into_iter().map(|o| o.login).collect())
    }
}

impl fmt::Display for MembershipSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Case-insensitive name comparison (Unicode lowercase folding).
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
