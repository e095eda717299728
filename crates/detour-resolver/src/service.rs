use std::sync::Arc;

use crate::resolver::Resolver;
use async_trait::async_trait;
use detour_core::normalize::normalize_request_path;
use detour_core::{ReadRuleStore, RedirectRule, StatusCatalog};
use tracing::{debug, trace};

/// Service for resolving request paths to redirect rules.
///
/// Uses a read-only store and a status catalog. A rule is eligible when its
/// source matches the path exactly, its destination is non-empty and its
/// status is currently allowed. Among eligible rules the highest revision
/// wins, then the highest id.
#[derive(Debug, Clone)]
pub struct ResolverService<R, S> {
    repository: Arc<R>,
    statuses: Arc<S>,
}

impl<R: ReadRuleStore, S: StatusCatalog> ResolverService<R, S> {
    /// Creates a new ResolverService with the given store and status catalog.
    pub fn new(repository: R, statuses: S) -> Self {
        Self {
            repository: Arc::new(repository),
            statuses: Arc::new(statuses),
        }
    }

    /// Resolves a request path to its redirect rule.
    ///
    /// # Arguments
    ///
    /// * `path` - The request path, with or without surrounding slashes
    ///
    /// # Returns
    ///
    /// * `Ok(Some(rule))` - The rule to serve
    /// * `Ok(None)` - If no eligible rule matches
    /// * `Err(e)` - If there was an error accessing the store
    pub async fn resolve(&self, path: &str) -> crate::Result<Option<RedirectRule>> {
        Resolver::resolve(self, path).await
    }
}

#[async_trait]
impl<R: ReadRuleStore, S: StatusCatalog> Resolver for ResolverService<R, S> {
    async fn resolve(&self, path: &str) -> crate::Result<Option<RedirectRule>> {
        let key = normalize_request_path(path);
        trace!(path = %path, key = %key, "resolving redirect");

        let allowed = self.statuses.allowed_statuses();
        let candidates = self.repository.find_by_source(&key).await?;

        let winner = candidates
            .into_iter()
            .filter(|rule| rule.source == key)
            .filter(|rule| !rule.destination.is_empty())
            .filter(|rule| allowed.contains(&rule.status))
            .max_by_key(|rule| (rule.revision, rule.id));

        match &winner {
            Some(rule) => {
                debug!(
                    key = %key,
                    rule_id = %rule.id,
                    destination = %rule.destination,
                    status = rule.status,
                    "resolved redirect"
                );
            }
            None => trace!(key = %key, "no redirect"),
        }

        Ok(winner)
    }
}
