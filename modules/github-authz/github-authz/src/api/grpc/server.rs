//! Envoy `ext_authz` gRPC service.

use std::sync::Arc;
use std::time::Duration;

use github_authz_sdk::proto::envoy::service::auth::v3::{
    CheckRequest, CheckResponse,
    authorization_server::{Authorization, AuthorizationServer},
};
use tokio::time::Instant;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

use super::mapper;
use crate::domain::{CheckInput, Service};

/// Tonic server type for [`AuthorizationService`], also the name the health
/// service reports status under.
pub type AuthorizationGrpcServer = AuthorizationServer<AuthorizationService>;

/// Slack left between the check deadline and the transport deadline, so a
/// verdict is rendered and written before the transport gives up.
pub const DEADLINE_MARGIN: Duration = Duration::from_millis(250);

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// `envoy.service.auth.v3.Authorization` backed by the domain [`Service`].
#[derive(Clone)]
pub struct AuthorizationService {
    svc: Arc<Service>,
    check_timeout: Duration,
}

impl AuthorizationService {
    /// `check_timeout` is the budget of one check, normally the server-side
    /// request timeout. A shorter `grpc-timeout` from the caller wins.
    #[must_use]
    pub fn new(svc: Arc<Service>, check_timeout: Duration) -> Self {
        Self { svc, check_timeout }
    }

    /// Wrap into the tonic server type for `Server::add_service`.
    #[must_use]
    pub fn into_server(self) -> AuthorizationGrpcServer {
        AuthorizationServer::new(self)
    }

    fn deadline(&self, metadata: &MetadataMap) -> Instant {
        let budget = grpc_timeout(metadata)
            .map_or(self.check_timeout, |t| t.min(self.check_timeout));
        Instant::now() + budget.saturating_sub(DEADLINE_MARGIN)
    }
}

/// Parse the `grpc-timeout` request header (`<1-8 digits><H|M|S|m|u|n>`).
fn grpc_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let raw = metadata.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let unit = raw.chars().last()?;
    let digits = &raw[..raw.len() - unit.len_utf8()];
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    match unit {
        'H' => Some(Duration::from_secs(value * 3600)),
        'M' => Some(Duration::from_secs(value * 60)),
        'S' => Some(Duration::from_secs(value)),
        'm' => Some(Duration::from_millis(value)),
        'u' => Some(Duration::from_micros(value)),
        'n' => Some(Duration::from_nanos(value)),
        _ => None,
    }
}

#[tonic::async_trait]
impl Authorization for AuthorizationService {
    /// Always answers with a `CheckResponse`; denials are carried in the
    /// response body, never as a gRPC error.
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let deadline = self.deadline(request.metadata());
        let request = request.into_inner();
        let input = CheckInput {
            deadline: Some(deadline),
            ..mapper::check_input(&request)
        };
        let verdict = self.svc.check(input).await;
        Ok(Response::new(mapper::check_response(&verdict)))
    }
}
