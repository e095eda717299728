use crate::error::Result;
use async_trait::async_trait;
use detour_core::{RedirectRule, RuleDraft, RuleId};

/// Whether a save creates a new rule or overwrites an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Create,
    Update(RuleId),
}

impl SaveMode {
    pub fn target(self) -> Option<RuleId> {
        match self {
            SaveMode::Create => None,
            SaveMode::Update(id) => Some(id),
        }
    }
}

#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Validates and persists a rule, maintaining the chain invariants.
    ///
    /// Fails with `MalformedInput` or `SameUrls` before anything is written.
    async fn save(&self, draft: RuleDraft, mode: SaveMode) -> Result<RedirectRule>;

    /// Deletes a rule. Returns `true` if the rule existed and was removed.
    async fn delete(&self, id: RuleId) -> Result<bool>;

    /// Retrieves a rule by id.
    async fn get(&self, id: RuleId) -> Result<Option<RedirectRule>>;
}
