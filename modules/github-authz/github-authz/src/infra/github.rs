//! GitHub REST client implementing [`IdentityProviderClient`].

use async_trait::async_trait;
use github_authz_sdk::{
    Credential, Identity, IdentityProviderClient, IdentityProviderError, Organization,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::GithubApiConfig;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("github-authz/", env!("CARGO_PKG_VERSION"));

#[derive(thiserror::Error, Debug)]
pub enum GithubClientError {
    #[error("invalid GitHub API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which endpoint a call targets, for error messages.
#[derive(Clone, Copy)]
enum Resource {
    User,
    Orgs,
}

impl Resource {
    fn noun(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Orgs => "orgs",
        }
    }
}

/// Shared, pooled client for `GET /user` and `GET /user/orgs`.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    user_url: Url,
    orgs_url: Url,
}

impl GithubClient {
    /// Build a client for the API rooted at `cfg.api_url`.
    ///
    /// # Errors
    /// Fails on an unparseable base URL or if the HTTP client cannot be built.
    pub fn new(cfg: &GithubApiConfig) -> Result<Self, GithubClientError> {
        let invalid = |reason: String| GithubClientError::InvalidUrl {
            url: cfg.api_url.clone(),
            reason,
        };

        // A trailing slash keeps path prefixes such as `/api/v3` on join.
        let mut base = cfg.api_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_owned()));
        }
        let user_url = base.join("user").map_err(|e| invalid(e.to_string()))?;
        let orgs_url = base.join("user/orgs").map_err(|e| invalid(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            user_url,
            orgs_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        resource: Resource,
        credential: &Credential,
    ) -> Result<T, IdentityProviderError> {
        let bearer = HeaderValue::try_from(format!("Bearer {}", credential.expose()))
            .map_err(|_| IdentityProviderError::Unauthorized("malformed credential".to_owned()))?;

        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, bearer)
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()
            .await
            .map_err(|e| {
                IdentityProviderError::Unavailable(format!(
                    "failed to fetch {}: {}",
                    resource.noun(),
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::debug!(url = %url, status = %status, "GitHub API rejected request");
            return Err(IdentityProviderError::Unauthorized(status.to_string()));
        }

        response.json::<T>().await.map_err(|e| {
            IdentityProviderError::Unavailable(format!(
                "failed to parse {} response: {}",
                resource.noun(),
                e.without_url()
            ))
        })
    }
}

#[async_trait]
impl IdentityProviderClient for GithubClient {
    #[tracing::instrument(skip_all)]
    async fn resolve_identity(
        &self,
        credential: &Credential,
    ) -> Result<Identity, IdentityProviderError> {
        self.get_json(&self.user_url, Resource::User, credential).await
    }

    #[tracing::instrument(skip_all)]
    async fn resolve_memberships(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Organization>, IdentityProviderError> {
        self.get_json(&self.orgs_url, Resource::Orgs, credential).await
    }
}
