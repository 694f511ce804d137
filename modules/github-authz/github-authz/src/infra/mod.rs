//! Infrastructure adapters.

pub mod github;
