//! Core types and traits for the Detour redirect engine.
//!
//! This crate provides the shared rule model, the URL normalizer, the
//! status configuration and the record store contracts used by both the
//! registry (write path) and the resolver (read path).

pub mod error;
pub mod normalize;
pub mod rule;
pub mod status;
pub mod store;

pub use error::{NormalizeError, StorageError};
pub use rule::{NormalizedRule, RedirectRule, RuleDraft, RuleId};
pub use status::{SharedStatusTable, StatusCatalog, StatusTable};
pub use store::{ReadRuleStore, RuleStore, RuleTransaction};
