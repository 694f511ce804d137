use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache TTL used when none (or zero) is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default identity provider base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubAuthzConfig {
    /// Allow/deny rules.
    pub policy: PolicyConfig,

    /// How long a resolved identity is reused for the same credential.
    /// Zero means [`DEFAULT_CACHE_TTL`].
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Identity provider connection settings.
    pub github: GithubApiConfig,
}

impl Default for GithubAuthzConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            github: GithubApiConfig::default(),
        }
    }
}

impl GithubAuthzConfig {
    /// Cache TTL with the zero value normalized to the default.
    #[must_use]
    pub fn effective_cache_ttl(&self) -> Duration {
        if self.cache_ttl.is_zero() {
            DEFAULT_CACHE_TTL
        } else {
            self.cache_ttl
        }
    }
}

/// Authorization rules, evaluated deny-list first.
///
/// Name comparisons are case-insensitive throughout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Organizations whose members are allowed. Empty means any authenticated user.
    pub organization_allow_list: Vec<String>,

    /// Per-organization team restrictions. Parsed and reported, not enforced.
    pub team_allow_list: BTreeMap<String, Vec<String>>,

    /// Users allowed regardless of organization membership.
    pub user_allow_list: Vec<String>,

    /// Users always denied. Overrides every other rule.
    pub user_deny_list: Vec<String>,
}

/// Identity provider connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubApiConfig {
    /// Base URL of the REST API (`/user` and `/user/orgs` are resolved against it).
    pub api_url: String,

    /// Upper bound for a single outbound call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for GithubApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API_URL.to_owned(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Serialize a [`Duration`] as a human-readable string (`5m`, `1h 30m`).
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// # Errors
    /// Fails when the string is not a valid humantime duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}
