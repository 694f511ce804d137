//! gRPC API layer.

pub mod mapper;
pub mod server;

pub use server::{AuthorizationGrpcServer, AuthorizationService};
