//! Authorization policy evaluation.
//!
//! Rules are applied in a fixed order and the first match wins:
//!
//! 1. user deny-list → deny
//! 2. user allow-list → allow
//! 3. no organization restriction → allow
//! 4. member of an allowed organization → allow
//! 5. otherwise → deny
//!
//! Team restrictions are read from configuration but not enforced: an
//! organization with a team list behaves like one without.

use std::fmt;

use github_authz_sdk::MembershipSet;
use github_authz_sdk::models::eq_ignore_case;

use crate::config::PolicyConfig;

/// Rule that granted access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowRule {
    UserAllowList,
    OpenAccess,
    Organization(String),
}

impl fmt::Display for AllowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserAllowList => f.write_str("user_allow_list"),
            Self::OpenAccess => f.write_str("open_access"),
            Self::Organization(org) => write!(f, "organization:{org}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow(AllowRule),
    Deny(String),
}

impl PolicyDecision {
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

fn listed(list: &[String], username: &str) -> bool {
    list.iter().any(|name| eq_ignore_case(name, username))
}

/// Evaluate `policy` for `username` with the given memberships.
#[must_use]
pub fn evaluate(
    username: &str,
    memberships: &MembershipSet,
    policy: &PolicyConfig,
) -> PolicyDecision {
    if listed(&policy.user_deny_list, username) {
        return PolicyDecision::Deny(format!("user {username:?} is in the deny list"));
    }

    if listed(&policy.user_allow_list, username) {
        return PolicyDecision::Allow(AllowRule::UserAllowList);
    }

    if policy.organization_allow_list.is_empty() {
        return PolicyDecision::Allow(AllowRule::OpenAccess);
    }

    if let Some(org) = memberships.first_member_of(&policy.organization_allow_list) {
        if let Some(teams) = configured_teams(policy, org) {
            tracing::debug!(
                user = username,
                org,
                teams = ?teams,
                "team restriction configured but not enforced"
            );
        }
        return PolicyDecision::Allow(AllowRule::Organization(org.to_owned()));
    }

    PolicyDecision::Deny(format!(
        "user {username:?} is not a member of any allowed organization"
    ))
}

fn configured_teams<'a>(policy: &'a PolicyConfig, org: &str) -> Option<&'a [String]> {
    policy
        .team_allow_list
        .iter()
        .find(|(name, teams)| !teams.is_empty() && eq_ignore_case(name, org))
        .map(|(_, teams)| teams.as_slice())
}
