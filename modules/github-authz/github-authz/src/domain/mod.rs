//! Domain layer for the GitHub `AuthZ` module.

pub mod cache;
pub mod credential;
pub mod error;
pub mod policy;
pub mod service;

pub use cache::{DecisionCache, ResolvedIdentity};
pub use error::{DenyCode, DomainError};
pub use policy::{AllowRule, PolicyDecision};
pub use service::{CheckInput, Service, Verdict};
