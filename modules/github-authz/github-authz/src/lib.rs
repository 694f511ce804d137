//! GitHub `AuthZ` Module
//!
//! External authorization decision point for Envoy. Each `Check` call:
//!
//! 1. extracts the bearer credential from the request's `authorization` header,
//! 2. resolves it to a GitHub identity and its organizations (cached per credential),
//! 3. evaluates the configured allow/deny rules,
//! 4. renders an allow response with identity headers, or a JSON deny response.
//!
//! ## Configuration
//!
//! ```yaml
//! github_authz:
//!   policy:
//!     organization_allow_list: ["acme"]
//!     team_allow_list: { acme: ["platform"] }   # parsed, not enforced
//!     user_allow_list: ["release-bot"]
//!     user_deny_list: ["mallory"]
//!   cache_ttl: 5m
//!   github:
//!     api_url: "https://api.github.com"
//!     request_timeout: 10s
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use api::grpc::{AuthorizationGrpcServer, AuthorizationService};
pub use config::{GithubApiConfig, GithubAuthzConfig, PolicyConfig};
pub use domain::Service;
pub use infra::github::GithubClient;
