//! Record store implementations for redirect rules.

pub mod memory;
pub mod mysql;

pub use detour_core::store::{ReadRuleStore, RuleStore, RuleTransaction};
pub use detour_core::StorageError;
pub use memory::InMemoryRuleStore;
pub use mysql::MySqlRuleStore;
