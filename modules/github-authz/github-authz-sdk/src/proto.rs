//! Envoy external authorization protocol bindings.
//!
//! Generated by `tonic-prost-build` from the trimmed protos under `proto/`.
//! The module tree mirrors the protobuf packages so cross-package references
//! in the generated code resolve.
//!
//! ```ignore
//! use github_authz_sdk::proto::envoy::service::auth::v3::authorization_server::{
//!     Authorization, AuthorizationServer,
//! };
//! ```

#![allow(missing_docs)]
#![allow(clippy::pedantic)]

pub mod envoy {
    pub mod config {
        pub mod core {
            pub mod v3 {
                tonic::include_proto!("envoy.config.core.v3");
            }
        }
    }

    pub mod r#type {
        pub mod v3 {
            tonic::include_proto!("envoy.r#type.v3");
        }
    }

    pub mod service {
        pub mod auth {
            pub mod v3 {
                tonic::include_proto!("envoy.service.auth.v3");
            }
        }
    }
}

pub mod google {
    pub mod rpc {
        tonic::include_proto!("google.rpc");
    }
}
