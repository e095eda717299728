use crate::Result;
use async_trait::async_trait;
use detour_core::RedirectRule;

#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// Resolves a request path to the rule that should serve it.
    /// Returns `None` if no eligible rule matches.
    async fn resolve(&self, path: &str) -> Result<Option<RedirectRule>>;
}
