use crate::error::{RegistryError, Result};
use crate::registry::{Registry, SaveMode};
use async_trait::async_trait;
use detour_core::{NormalizedRule, RedirectRule, RuleDraft, RuleId, RuleStore, RuleTransaction};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A concrete implementation of the [`Registry`] trait over a [`RuleStore`].
///
/// Each save runs these steps in one store transaction:
/// 1. delete the exact reverse of the rule (`B -> A` when saving `A -> B`),
/// 2. if the destination is itself a redirected path, follow that redirect
///    so the rule points at the final destination,
/// 3. insert or update the rule,
/// 4. re-point every rule that led to the saved source path at the saved
///    destination, following chains with a worklist.
///
/// Validation happens before the transaction opens; any later failure rolls
/// the whole save back.
#[derive(Debug, Clone)]
pub struct RegistryService<S> {
    store: Arc<S>,
}

impl<S: RuleStore> RegistryService<S> {
    /// Creates a new `RegistryService` over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Saves a new rule.
    pub async fn create(&self, draft: RuleDraft) -> Result<RedirectRule> {
        Registry::save(self, draft, SaveMode::Create).await
    }

    /// Overwrites rule `id` with `draft`.
    pub async fn update(&self, id: RuleId, draft: RuleDraft) -> Result<RedirectRule> {
        Registry::save(self, draft, SaveMode::Update(id)).await
    }

    async fn apply(
        tx: &mut dyn RuleTransaction,
        rule: &NormalizedRule,
        mode: SaveMode,
    ) -> Result<RedirectRule> {
        if let SaveMode::Update(id) = mode {
            if tx.get(id).await?.is_none() {
                return Err(RegistryError::RuleNotFound(id));
            }
        }

        Self::drop_reverse(tx, rule, mode.target()).await?;

        let rule = Self::forward(tx, rule, mode.target()).await?;
        let saved = tx.insert_or_update(mode.target(), &rule).await?;

        let repointed = Self::collapse_chains(tx, &saved).await?;
        if repointed > 0 {
            debug!(
                rule_id = %saved.id,
                source = %saved.source,
                repointed,
                "collapsed redirect chains"
            );
        }

        Ok(saved)
    }

    async fn drop_reverse(
        tx: &mut dyn RuleTransaction,
        rule: &NormalizedRule,
        own_id: Option<RuleId>,
    ) -> Result<()> {
        for candidate in tx.find_by_source(&rule.destination).await? {
            if Some(candidate.id) == own_id || !rule.is_reverse_of(&candidate) {
                continue;
            }

            debug!(
                rule_id = %candidate.id,
                source = %candidate.source,
                destination = %candidate.destination,
                "deleting reverse redirect"
            );
            tx.delete(candidate.id).await?;
        }

        Ok(())
    }

    /// Follows the newest redirect of `rule.destination`, if any. One hop is
    /// enough because stored destinations are never redirected paths.
    async fn forward(
        tx: &mut dyn RuleTransaction,
        rule: &NormalizedRule,
        own_id: Option<RuleId>,
    ) -> Result<NormalizedRule> {
        if rule.external {
            return Ok(rule.clone());
        }

        let next_hop = tx
            .find_by_source(&rule.destination)
            .await?
            .into_iter()
            .filter(|hop| Some(hop.id) != own_id)
            .filter(|hop| !hop.destination.is_empty() && hop.destination != rule.source)
            .max_by_key(|hop| (hop.revision, hop.id));

        let Some(hop) = next_hop else {
            return Ok(rule.clone());
        };

        debug!(
            source = %rule.source,
            via = %rule.destination,
            destination = %hop.destination,
            "following existing redirect"
        );
        Ok(NormalizedRule {
            destination: hop.destination,
            external: hop.external,
            ..rule.clone()
        })
    }

    /// Points everything that led to `saved.source` straight at
    /// `saved.destination`. Returns the number of re-pointed rules.
    async fn collapse_chains(
        tx: &mut dyn RuleTransaction,
        saved: &RedirectRule,
    ) -> Result<usize> {
        let mut visited = HashSet::from([saved.id]);
        let mut pending = VecDeque::from([saved.source.clone()]);
        let mut repointed = 0;

        while let Some(path) = pending.pop_front() {
            for rule in tx.find_by_destination(&path).await? {
                if !visited.insert(rule.id) {
                    continue;
                }

                // Re-pointing this one would make it redirect to itself: it
                // closes a cycle through the saved rule.
                if rule.source == saved.destination {
                    warn!(
                        rule_id = %rule.id,
                        source = %rule.source,
                        "deleting redirect that would loop back to itself"
                    );
                    tx.delete(rule.id).await?;
                    continue;
                }

                trace!(
                    rule_id = %rule.id,
                    from = %rule.destination,
                    to = %saved.destination,
                    "re-pointing redirect"
                );
                tx.repoint(rule.id, &saved.destination, saved.external)
                    .await?;
                repointed += 1;
                pending.push_back(rule.source);
            }
        }

        Ok(repointed)
    }
}

#[async_trait]
impl<S: RuleStore> Registry for RegistryService<S> {
    async fn save(&self, draft: RuleDraft, mode: SaveMode) -> Result<RedirectRule> {
        let rule = draft.normalize()?;
        if rule.is_self_redirect() {
            return Err(RegistryError::SameUrls { path: rule.source });
        }

        let mut tx = self.store.begin().await?;
        match Self::apply(tx.as_mut(), &rule, mode).await {
            Ok(saved) => {
                tx.commit().await?;
                info!(
                    rule_id = %saved.id,
                    source = %saved.source,
                    destination = %saved.destination,
                    status = saved.status,
                    "saved redirect"
                );
                Ok(saved)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "failed to roll back redirect save");
                }
                Err(err)
            }
        }
    }

    async fn delete(&self, id: RuleId) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        let deleted = match tx.delete(id).await {
            Ok(deleted) => deleted,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "failed to roll back redirect delete");
                }
                return Err(err.into());
            }
        };
        tx.commit().await?;

        if deleted {
            info!(rule_id = %id, "deleted redirect");
        }
        Ok(deleted)
    }

    async fn get(&self, id: RuleId) -> Result<Option<RedirectRule>> {
        Ok(self.store.get(id).await?)
    }
}
