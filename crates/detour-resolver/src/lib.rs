//! Redirect resolution.
//!
//! This crate provides a [`ResolverService`] that maps a request path to the
//! single rule that should serve it. Chains are collapsed when rules are
//! written, so resolution is always a single lookup.
//!
//! # Example
//!
//! ```rust
//! use detour_core::StatusTable;
//! use detour_resolver::ResolverService;
//! use detour_storage::InMemoryRuleStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ResolverService::new(InMemoryRuleStore::new(), StatusTable::default());
//!
//! if let Some(rule) = resolver.resolve("/old-page/").await? {
//!     println!("{} -> {}", rule.status, rule.destination);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod resolver;
pub mod service;

pub use error::{ResolverError, Result};
pub use resolver::Resolver;
pub use service::ResolverService;
