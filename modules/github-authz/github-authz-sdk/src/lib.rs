#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! GitHub `AuthZ` SDK
//!
//! This crate provides the public contract of the `github_authz` module:
//!
//! - [`IdentityProviderClient`] - API trait for resolving a bearer credential into an identity
//! - [`Credential`], [`Identity`], [`Organization`], [`MembershipSet`] - Domain models
//! - [`IdentityProviderError`] - Error types
//! - [`proto`] - Envoy `ext_authz` v3 protocol bindings (server and client)
//!
//! ## Usage
//!
//! ```ignore
//! use github_authz_sdk::{Credential, IdentityProviderClient};
//!
//! let credential = Credential::new("gho_xyz...");
//! let identity = idp.resolve_identity(&credential).await?;
//! let orgs = idp.resolve_memberships(&credential).await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod proto;

// Re-export main types at crate root
pub use api::IdentityProviderClient;
pub use error::IdentityProviderError;
pub use models::{Credential, Identity, MembershipSet, Organization};
