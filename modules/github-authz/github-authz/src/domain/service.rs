//! Check orchestration: credential → identity (cached) → policy → verdict.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use github_authz_sdk::{Credential, IdentityProviderClient, IdentityProviderError, MembershipSet};
use tokio::time::Instant;
use tracing::{info, warn};

use super::cache::{DecisionCache, ResolvedIdentity};
use super::credential::parse_bearer;
use super::error::{DenyCode, DomainError};
use super::policy::{self, AllowRule, PolicyDecision};
use crate::config::{GithubAuthzConfig, PolicyConfig};

/// The parts of an inbound check the service looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckInput<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Raw `authorization` header value, if the request carried one.
    pub authorization: Option<&'a str>,
    /// Instant by which a verdict must be rendered. Every upstream call of
    /// the check is cut off at this point, on top of its own request timeout.
    pub deadline: Option<Instant>,
}

/// Outcome of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow {
        resolved: Arc<ResolvedIdentity>,
        rule: AllowRule,
    },
    Deny {
        code: DenyCode,
        message: String,
    },
}

impl Verdict {
    fn deny(err: &DomainError) -> Self {
        Self::Deny {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// GitHub authorization service.
///
/// Owns the decision cache; the policy is fixed at construction.
pub struct Service {
    provider: Arc<dyn IdentityProviderClient>,
    cache: DecisionCache,
    policy: PolicyConfig,
    upstream_timeout: Duration,
}

impl Service {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProviderClient>, cfg: &GithubAuthzConfig) -> Self {
        Self {
            provider,
            cache: DecisionCache::new(cfg.effective_cache_ttl()),
            policy: cfg.policy.clone(),
            upstream_timeout: cfg.github.request_timeout,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// Decide whether the request described by `input` may proceed.
    ///
    /// Never fails: every error becomes a [`Verdict::Deny`].
    #[tracing::instrument(skip_all, fields(path = %input.path, method = %input.method))]
    pub async fn check(&self, input: CheckInput<'_>) -> Verdict {
        info!(
            has_auth_header = input.authorization.is_some_and(|h| !h.is_empty()),
            "authorization check"
        );

        let credential = match parse_bearer(input.authorization) {
            Ok(c) => c,
            Err(e) => {
                let err = DomainError::from(e);
                warn!(reason = %err, "authorization denied");
                return Verdict::deny(&err);
            }
        };

        let resolved = match self.resolve(credential, input.deadline).await {
            Ok(r) => r,
            Err(err) => {
                if err.is_upstream_unavailable() {
                    warn!(error = %err, "identity provider unavailable");
                }
                warn!(reason = %err, "authorization denied");
                return Verdict::deny(&err);
            }
        };

        let user = resolved.identity.login.as_str();
        let orgs = &resolved.memberships;
        match policy::evaluate(user, orgs, &self.policy) {
            PolicyDecision::Allow(rule) => {
                info!(user, orgs = %orgs, rule = %rule, "authorization granted");
                Verdict::Allow { resolved, rule }
            }
            PolicyDecision::Deny(reason) => {
                warn!(user, orgs = %orgs, reason = %reason, "authorization denied");
                Verdict::deny(&DomainError::PermissionDenied(reason))
            }
        }
    }

    /// Cached identity for `credential`, resolving and storing it on a miss.
    async fn resolve(
        &self,
        credential: Credential,
        deadline: Option<Instant>,
    ) -> Result<Arc<ResolvedIdentity>, DomainError> {
        if let Some(hit) = self.cache.lookup(&credential) {
            tracing::debug!(user = %hit.identity.login, "identity cache hit");
            return Ok(hit);
        }

        let identity = self
            .bounded(
                "failed to fetch user",
                deadline,
                self.provider.resolve_identity(&credential),
            )
            .await?;

        let memberships = match self
            .bounded(
                "failed to fetch organizations",
                deadline,
                self.provider.resolve_memberships(&credential),
            )
            .await
        {
            Ok(orgs) => MembershipSet::from(orgs),
            Err(e) => {
                warn!(user = %identity.login, error = %e, "failed to fetch organizations");
                MembershipSet::empty()
            }
        };

        Ok(self.cache.store(
            credential,
            ResolvedIdentity {
                identity,
                memberships,
            },
        ))
    }

    /// Run an upstream call until the earlier of its own request timeout and
    /// the check deadline. Dropping the inner future on expiry aborts the
    /// outbound request.
    async fn bounded<T, F>(
        &self,
        what: &str,
        deadline: Option<Instant>,
        call: F,
    ) -> Result<T, IdentityProviderError>
    where
        F: Future<Output = Result<T, IdentityProviderError>>,
    {
        let per_call = Instant::now() + self.upstream_timeout;
        let cutoff = deadline.map_or(per_call, |d| d.min(per_call));

        tokio::time::timeout_at(cutoff, call).await.unwrap_or_else(|_| {
            let reason = if cutoff < per_call {
                "check deadline exceeded".to_owned()
            } else {
                format!(
                    "request timed out after {}",
                    humantime::format_duration(self.upstream_timeout)
                )
            };
            Err(IdentityProviderError::Unavailable(format!("{what}: {reason}")))
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use github_authz_sdk::{Identity, Organization};

    use super::*;

    #[derive(Default)]
    struct FakeProvider {
        login: String,
        orgs: Vec<&'static str>,
        reject: bool,
        orgs_fail: bool,
        hang: bool,
        identity_delay: Duration,
        orgs_hang: bool,
        identity_calls: AtomicUsize,
        membership_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn user(login: &str, orgs: &[&'static str]) -> Self {
            Self {
                login: login.to_owned(),
                orgs: orgs.to_vec(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl IdentityProviderClient for FakeProvider {
        async fn resolve_identity(
            &self,
            _credential: &Credential,
        ) -> Result<Identity, IdentityProviderError> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.identity_delay).await;
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.reject {
                return Err(IdentityProviderError::Unauthorized(
                    "401 Unauthorized".to_owned(),
                ));
            }
            Ok(Identity {
                login: self.login.clone(),
                id: 7,
                name: None,
                email: None,
                avatar_url: None,
            })
        }

        async fn resolve_memberships(
            &self,
            _credential: &Credential,
        ) -> Result<Vec<Organization>, IdentityProviderError> {
            self.membership_calls.fetch_add(1, Ordering::SeqCst);
            if self.orgs_hang {
                std::future::pending::<()>().await;
            }
            if self.orgs_fail {
                return Err(IdentityProviderError::Unauthorized("403 Forbidden".to_owned()));
            }
            Ok(self
                .orgs
                .iter()
                .zip(1..)
                .map(|(name, id)| Organization {
                    login: (*name).to_owned(),
                    id,
                    description: None,
                })
                .collect())
        }
    }

    fn config(org_allow: &[&str], user_deny: &[&str]) -> GithubAuthzConfig {
        let mut cfg = GithubAuthzConfig::default();
        cfg.policy.organization_allow_list = org_allow.iter().map(|s| (*s).to_owned()).collect();
        cfg.policy.user_deny_list = user_deny.iter().map(|s| (*s).to_owned()).collect();
        cfg
    }

    fn input(authorization: Option<&str>) -> CheckInput<'_> {
        CheckInput {
            method: "GET",
            path: "/api/v1/items",
            authorization,
            deadline: None,
        }
    }

    fn deny_of(verdict: Verdict) -> (DenyCode, String) {
        match verdict {
            Verdict::Deny { code, message } => (code, message),
            Verdict::Allow { .. } => panic!("expected deny, got {verdict:?}"),
        }
    }

    #[tokio::test]
    async fn member_of_allowed_org_is_granted() {
        let provider = Arc::new(FakeProvider::user("alice", &["acme", "other"]));
        let svc = Service::new(provider, &config(&["acme"], &[]));

        match svc.check(input(Some("Bearer t1"))).await {
            Verdict::Allow { resolved, rule } => {
                assert_eq!(resolved.identity.login, "alice");
                assert_eq!(resolved.memberships.joined(), "acme,other");
                assert_eq!(rule, AllowRule::Organization("acme".to_owned()));
            }
            other @ Verdict::Deny { .. } => panic!("expected allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_member_is_permission_denied() {
        let provider = Arc::new(FakeProvider::user("bob", &["other"]));
        let svc = Service::new(provider, &config(&["acme"], &[]));

        let (code, message) = deny_of(svc.check(input(Some("Bearer t1"))).await);
        assert_eq!(code, DenyCode::PermissionDenied);
        assert_eq!(
            message,
            "user \"bob\" is not a member of any allowed organization"
        );
    }

    #[tokio::test]
    async fn deny_list_beats_membership() {
        let provider = Arc::new(FakeProvider::user("carol", &["acme"]));
        let svc = Service::new(provider, &config(&["acme"], &["carol"]));

        let (code, _) = deny_of(svc.check(input(Some("Bearer t1"))).await);
        assert_eq!(code, DenyCode::PermissionDenied);
    }

    #[tokio::test]
    async fn missing_header_skips_provider() {
        let provider = Arc::new(FakeProvider::user("alice", &[]));
        let svc = Service::new(provider.clone(), &config(&[], &[]));

        let (code, message) = deny_of(svc.check(input(None)).await);
        assert_eq!(code, DenyCode::Unauthenticated);
        assert_eq!(message, "missing Authorization header");
        assert_eq!(provider.identity_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_token_is_unauthenticated_and_not_cached() {
        let provider = Arc::new(FakeProvider {
            reject: true,
            ..FakeProvider::default()
        });
        let svc = Service::new(provider.clone(), &config(&[], &[]));

        let (code, message) = deny_of(svc.check(input(Some("Bearer bad"))).await);
        assert_eq!(code, DenyCode::Unauthenticated);
        assert_eq!(message, "invalid token: GitHub API error: 401 Unauthorized");
        assert_eq!(provider.membership_calls.load(Ordering::SeqCst), 0);
        assert!(svc.cache().is_empty());

        let _ = svc.check(input(Some("Bearer bad"))).await;
        assert_eq!(provider.identity_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_check_is_served_from_cache() {
        let provider = Arc::new(FakeProvider::user("alice", &["acme"]));
        let svc = Service::new(provider.clone(), &config(&["acme"], &[]));

        let first = svc.check(input(Some("Bearer t1"))).await;
        let second = svc.check(input(Some("Bearer t1"))).await;

        assert_eq!(first, second);
        assert_eq!(provider.identity_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.membership_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_resolved_again() {
        let provider = Arc::new(FakeProvider::user("alice", &[]));
        let mut cfg = config(&[], &[]);
        cfg.cache_ttl = Duration::from_secs(30);
        let svc = Service::new(provider.clone(), &cfg);

        let _ = svc.check(input(Some("Bearer t1"))).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        let _ = svc.check(input(Some("Bearer t1"))).await;

        assert_eq!(provider.identity_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn membership_failure_degrades_to_empty_set() {
        let provider = Arc::new(FakeProvider {
            login: "alice".to_owned(),
            orgs_fail: true,
            ..FakeProvider::default()
        });

        let open = Service::new(provider.clone(), &config(&[], &[]));
        match open.check(input(Some("Bearer t1"))).await {
            Verdict::Allow { resolved, .. } => assert!(resolved.memberships.is_empty()),
            other @ Verdict::Deny { .. } => panic!("expected allow, got {other:?}"),
        }

        let restricted = Service::new(provider, &config(&["acme"], &[]));
        let (code, _) = deny_of(restricted.check(input(Some("Bearer t1"))).await);
        assert_eq!(code, DenyCode::PermissionDenied);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_provider_hits_upstream_deadline() {
        let provider = Arc::new(FakeProvider {
            hang: true,
            ..FakeProvider::default()
        });
        let mut cfg = config(&[], &[]);
        cfg.github.request_timeout = Duration::from_secs(2);
        let svc = Service::new(provider, &cfg);

        let (code, message) = deny_of(svc.check(input(Some("Bearer t1"))).await);
        assert_eq!(code, DenyCode::Unauthenticated);
        assert_eq!(
            message,
            "invalid token: failed to fetch user: request timed out after 2s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn check_deadline_cuts_hanging_orgs_call_and_still_allows() {
        let provider = Arc::new(FakeProvider {
            login: "alice".to_owned(),
            identity_delay: Duration::from_millis(1500),
            orgs_hang: true,
            ..FakeProvider::default()
        });
        let mut cfg = config(&[], &[]);
        cfg.github.request_timeout = Duration::from_secs(2);
        let svc = Service::new(provider.clone(), &cfg);

        let started = Instant::now();
        let check = CheckInput {
            deadline: Some(started + Duration::from_secs(3)),
            ..input(Some("Bearer t1"))
        };
        match svc.check(check).await {
            Verdict::Allow { resolved, rule } => {
                assert!(resolved.memberships.is_empty());
                assert_eq!(rule, AllowRule::OpenAccess);
            }
            other @ Verdict::Deny { .. } => panic!("expected allow, got {other:?}"),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(provider.membership_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn check_deadline_before_request_timeout_denies_stuck_identity_call() {
        let provider = Arc::new(FakeProvider {
            hang: true,
            ..FakeProvider::default()
        });
        let mut cfg = config(&[], &[]);
        cfg.github.request_timeout = Duration::from_secs(10);
        let svc = Service::new(provider, &cfg);

        let started = Instant::now();
        let check = CheckInput {
            deadline: Some(started + Duration::from_secs(1)),
            ..input(Some("Bearer t1"))
        };
        let (code, message) = deny_of(svc.check(check).await);
        assert_eq!(code, DenyCode::Unauthenticated);
        assert_eq!(
            message,
            "invalid token: failed to fetch user: check deadline exceeded"
        );
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }
}
