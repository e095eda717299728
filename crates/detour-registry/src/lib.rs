//! Redirect rule registry.
//!
//! The registry is the only write path for redirect rules. Every save
//! normalizes the rule, rejects self-redirects, drops the reverse rule and
//! collapses every chain that ran through the saved source path, all inside
//! a single store transaction.

pub mod error;
pub mod registry;
pub mod service;

pub use error::{RegistryError, Result};
pub use registry::{Registry, SaveMode};
pub use service::RegistryService;
