use crate::error::Result;
use crate::rule::{NormalizedRule, RedirectRule, RuleId};
use async_trait::async_trait;

/// A read-only view of a rule store.
///
/// Every call observes a consistent snapshot: a read never sees a save
/// half-way through its chain collapse.
#[async_trait]
pub trait ReadRuleStore: Send + Sync + 'static {
    /// Retrieves a rule by id.
    async fn get(&self, id: RuleId) -> Result<Option<RedirectRule>>;

    /// Returns every rule whose source equals `source` byte-for-byte.
    async fn find_by_source(&self, source: &str) -> Result<Vec<RedirectRule>>;
}

#[async_trait]
pub trait RuleStore: ReadRuleStore {
    /// Opens a write transaction.
    ///
    /// The transaction holds an exclusive write lock over the whole rule set
    /// until it is committed or rolled back. Dropping it without committing
    /// discards its changes.
    async fn begin(&self) -> Result<Box<dyn RuleTransaction>>;
}

/// A write transaction over a rule store.
///
/// All string comparisons are byte-exact.
#[async_trait]
pub trait RuleTransaction: Send {
    async fn get(&mut self, id: RuleId) -> Result<Option<RedirectRule>>;

    async fn find_by_source(&mut self, source: &str) -> Result<Vec<RedirectRule>>;

    async fn find_by_destination(&mut self, destination: &str) -> Result<Vec<RedirectRule>>;

    /// Inserts a rule when `id` is `None`, otherwise overwrites rule `id`.
    ///
    /// Either way the rule receives a fresh revision. Overwriting a missing
    /// rule is an `InvalidData` error.
    async fn insert_or_update(
        &mut self,
        id: Option<RuleId>,
        rule: &NormalizedRule,
    ) -> Result<RedirectRule>;

    /// Points rule `id` at a new destination, keeping its revision.
    ///
    /// Returns `false` if the rule does not exist.
    async fn repoint(&mut self, id: RuleId, destination: &str, external: bool) -> Result<bool>;

    /// Returns `true` if the rule existed and was removed.
    async fn delete(&mut self, id: RuleId) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
