use async_trait::async_trait;
use detour_core::error::{Result, StorageError};
use detour_core::rule::{NormalizedRule, RedirectRule, RuleId};
use detour_core::store::{ReadRuleStore, RuleStore, RuleTransaction};
use jiff::Timestamp;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Default)]
struct Table {
    rules: BTreeMap<RuleId, RedirectRule>,
    last_id: u64,
    revision: u64,
}

impl Table {
    fn by_source(&self, source: &str) -> Vec<RedirectRule> {
        self.rules
            .values()
            .filter(|rule| rule.source == source)
            .cloned()
            .collect()
    }

    fn by_destination(&self, destination: &str) -> Vec<RedirectRule> {
        self.rules
            .values()
            .filter(|rule| rule.destination == destination)
            .cloned()
            .collect()
    }
}

/// In-memory implementation of the rule store.
///
/// The whole table sits behind one async `RwLock`. A transaction holds the
/// write guard for its lifetime and works on a staged copy that replaces the
/// table on commit, so readers only ever see committed states.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryRuleStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every committed rule ordered by id.
    pub async fn rules(&self) -> Vec<RedirectRule> {
        self.table.read().await.rules.values().cloned().collect()
    }

    /// Returns the number of committed rules.
    pub async fn len(&self) -> usize {
        self.table.read().await.rules.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReadRuleStore for InMemoryRuleStore {
    async fn get(&self, id: RuleId) -> Result<Option<RedirectRule>> {
        Ok(self.table.read().await.rules.get(&id).cloned())
    }

    async fn find_by_source(&self, source: &str) -> Result<Vec<RedirectRule>> {
        Ok(self.table.read().await.by_source(source))
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn begin(&self) -> Result<Box<dyn RuleTransaction>> {
        let guard = Arc::clone(&self.table).write_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }
}

struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<Table>,
    staged: Table,
}

#[async_trait]
impl RuleTransaction for InMemoryTransaction {
    async fn get(&mut self, id: RuleId) -> Result<Option<RedirectRule>> {
        Ok(self.staged.rules.get(&id).cloned())
    }

    async fn find_by_source(&mut self, source: &str) -> Result<Vec<RedirectRule>> {
        Ok(self.staged.by_source(source))
    }

    async fn find_by_destination(&mut self, destination: &str) -> Result<Vec<RedirectRule>> {
        Ok(self.staged.by_destination(destination))
    }

    async fn insert_or_update(
        &mut self,
        id: Option<RuleId>,
        rule: &NormalizedRule,
    ) -> Result<RedirectRule> {
        let now = Timestamp::now();
        let revision = self.staged.revision + 1;

        let saved = match id {
            None => {
                let id = RuleId::new(self.staged.last_id + 1);
                let saved = RedirectRule {
                    id,
                    source: rule.source.clone(),
                    destination: rule.destination.clone(),
                    external: rule.external,
                    status: rule.status,
                    revision,
                    created_at: now,
                    updated_at: now,
                };
                self.staged.last_id = id.get();
                self.staged.rules.insert(id, saved.clone());
                saved
            }
            Some(id) => {
                let Some(existing) = self.staged.rules.get_mut(&id) else {
                    return Err(StorageError::InvalidData(format!(
                        "cannot update missing rule {id}"
                    )));
                };
                existing.source = rule.source.clone();
                existing.destination = rule.destination.clone();
                existing.external = rule.external;
                existing.status = rule.status;
                existing.revision = revision;
                existing.updated_at = now;
                existing.clone()
            }
        };

        self.staged.revision = revision;
        Ok(saved)
    }

    async fn repoint(&mut self, id: RuleId, destination: &str, external: bool) -> Result<bool> {
        let Some(existing) = self.staged.rules.get_mut(&id) else {
            return Ok(false);
        };
        existing.destination = destination.to_string();
        existing.external = external;
        existing.updated_at = Timestamp::now();
        Ok(true)
    }

    async fn delete(&mut self, id: RuleId) -> Result<bool> {
        Ok(self.staged.rules.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
