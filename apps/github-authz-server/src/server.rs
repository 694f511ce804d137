//! gRPC server hosting the `ext_authz` Authorization service.

use std::sync::Arc;

use anyhow::Context as _;
use github_authz::{AuthorizationGrpcServer, AuthorizationService, GithubClient, Service};
use tonic_health::ServingStatus;
use tonic_health::server::HealthReporter;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use crate::config::AppConfig;

/// Serve checks until SIGINT/SIGTERM, then report `NOT_SERVING` and drain
/// in-flight calls.
///
/// # Errors
/// Fails if the GitHub client cannot be built or the listener fails.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let authz = &cfg.github_authz;
    let client = GithubClient::new(&authz.github).context("failed to create GitHub client")?;
    let service = Arc::new(Service::new(Arc::new(client), authz));

    info!(
        listen_addr = %cfg.server.bind_addr,
        allowed_orgs = ?authz.policy.organization_allow_list,
        allowed_users_count = authz.policy.user_allow_list.len(),
        denied_users_count = authz.policy.user_deny_list.len(),
        team_restrictions_count = authz.policy.team_allow_list.len(),
        cache_ttl = %humantime::format_duration(authz.effective_cache_ttl()),
        check_timeout = %humantime::format_duration(cfg.server.check_timeout),
        "starting GitHub authorization server"
    );

    let trace = TraceLayer::new_for_grpc()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let (health, health_service) = tonic_health::server::health_reporter();
    mark_serving(&health).await;

    let check_timeout = cfg.server.check_timeout;
    tonic::transport::Server::builder()
        .timeout(check_timeout)
        .layer(trace)
        .add_service(health_service)
        .add_service(AuthorizationService::new(service, check_timeout).into_server())
        .serve_with_shutdown(cfg.server.bind_addr, shutdown_signal(&health))
        .await
        .with_context(|| format!("gRPC server on {} failed", cfg.server.bind_addr))?;

    info!("server stopped");
    Ok(())
}

async fn mark_serving(health: &HealthReporter) {
    health.set_serving::<AuthorizationGrpcServer>().await;
}

/// Flip both the overall and the per-service status so health checks stop
/// routing new calls here while in-flight checks drain.
async fn mark_not_serving(health: &HealthReporter) {
    health.set_not_serving::<AuthorizationGrpcServer>().await;
    health.set_service_status("", ServingStatus::NotServing).await;
}

async fn shutdown_signal(health: &HealthReporter) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received, draining in-flight checks");
    mark_not_serving(health).await;
}
