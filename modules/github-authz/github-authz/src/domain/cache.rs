//! In-memory decision cache keyed by credential.
//!
//! Entries expire lazily: an expired entry is reported as absent by
//! [`DecisionCache::lookup`] and replaced by the next [`DecisionCache::store`].
//! There is no background sweep and no cardinality cap.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use github_authz_sdk::{Credential, Identity, MembershipSet};
use tokio::time::Instant;

/// Identity and memberships resolved for one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: Identity,
    pub memberships: MembershipSet,
}

#[derive(Debug)]
struct CacheEntry {
    resolved: Arc<ResolvedIdentity>,
    expires_at: Instant,
}

/// Concurrent credential → identity cache with a single TTL.
#[derive(Debug)]
pub struct DecisionCache {
    entries: DashMap<Credential, CacheEntry>,
    ttl: Duration,
}

impl DecisionCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached identity for `credential`, unless absent or expired.
    #[must_use]
    pub fn lookup(&self, credential: &Credential) -> Option<Arc<ResolvedIdentity>> {
        let now = Instant::now();
        self.entries
            .get(credential)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| Arc::clone(&entry.resolved))
    }

    /// Insert or overwrite the entry for `credential`, expiring `ttl` from now.
    pub fn store(
        &self,
        credential: Credential,
        resolved: ResolvedIdentity,
    ) -> Arc<ResolvedIdentity> {
        let resolved = Arc::new(resolved);
        let entry = CacheEntry {
            resolved: Arc::clone(&resolved),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(credential, entry);
        resolved
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
