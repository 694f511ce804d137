//! Process configuration.
//!
//! Layers, later wins:
//!
//! 1. compiled-in defaults
//! 2. YAML file given with `--config`
//! 3. `GITHUB_AUTHZ__*` environment variables (`__` separates nesting levels,
//!    e.g. `GITHUB_AUTHZ__SERVER__BIND_ADDR`)
//! 4. flat variables understood by earlier deployments
//!    (`GITHUB_ALLOWED_ORGS`, `AUTHZ_CACHE_TTL`, ...)

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use github_authz::GithubAuthzConfig;
use github_authz::config::humantime_serde;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "GITHUB_AUTHZ__";
pub const DEFAULT_PORT: u16 = 9001;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Invalid(#[from] Box<figment::Error>),

    #[error("invalid {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub github_authz: GithubAuthzConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// gRPC listen address.
    pub bind_addr: SocketAddr,

    /// Upper bound on a single check, including upstream calls.
    #[serde(with = "humantime_serde")]
    pub check_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            check_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Json,
        }
    }
}

fn base_figment() -> Figment {
    Figment::from(Serialized::defaults(AppConfig::default()))
}

/// Load the configuration from all layers.
///
/// # Errors
/// Fails on a missing config file, a malformed value in any layer, or a
/// malformed flat environment variable.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = base_figment();
    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        figment = figment.merge(Yaml::file(path));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let mut cfg: AppConfig = figment.extract().map_err(Box::new)?;
    apply_legacy_env(&mut cfg, |var| std::env::var(var).ok())?;
    Ok(cfg)
}

/// Comma-separated list: items trimmed, empty items dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Overlay the flat environment variables. Only variables that are set
/// override the layered value.
///
/// # Errors
/// `GITHUB_ALLOWED_TEAMS` must be a JSON object of string arrays,
/// `AUTHZ_CACHE_TTL` a duration and `AUTHZ_PORT` a port number.
pub fn apply_legacy_env<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let policy = &mut cfg.github_authz.policy;

    if let Some(raw) = lookup("GITHUB_ALLOWED_ORGS").filter(|v| !v.trim().is_empty()) {
        policy.organization_allow_list = split_list(&raw);
    }
    if let Some(raw) = lookup("GITHUB_ALLOWED_USERS").filter(|v| !v.trim().is_empty()) {
        policy.user_allow_list = split_list(&raw);
    }
    if let Some(raw) = lookup("GITHUB_DENIED_USERS").filter(|v| !v.trim().is_empty()) {
        policy.user_deny_list = split_list(&raw);
    }

    if let Some(raw) = lookup("GITHUB_ALLOWED_TEAMS").filter(|v| !v.trim().is_empty()) {
        policy.team_allow_list = serde_json::from_str::<BTreeMap<String, Vec<String>>>(&raw)
            .map_err(|e| ConfigError::InvalidEnv {
                var: "GITHUB_ALLOWED_TEAMS",
                reason: e.to_string(),
            })?;
    }

    if let Some(raw) = lookup("AUTHZ_CACHE_TTL").filter(|v| !v.trim().is_empty()) {
        cfg.github_authz.cache_ttl =
            humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::InvalidEnv {
                var: "AUTHZ_CACHE_TTL",
                reason: e.to_string(),
            })?;
    }

    if let Some(raw) = lookup("AUTHZ_PORT").filter(|v| !v.trim().is_empty()) {
        let port = raw
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnv {
                var: "AUTHZ_PORT",
                reason: e.to_string(),
            })?;
        cfg.server.bind_addr.set_port(port);
    }

    if lookup("DEBUG").is_some_and(|v| v == "true") {
        "debug".clone_into(&mut cfg.logging.level);
    }

    Ok(())
}
