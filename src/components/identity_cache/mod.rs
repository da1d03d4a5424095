mod actor;

pub use actor::{keys, IdentityCacheActor, IdentityCacheCommand, IdentityCacheHandle};

use crate::error::AppResult;
use async_trait::async_trait;

/// Storage for name→identifier mappings. Every calendar event the
/// assistant creates is addressed by its user-visible name, and this
/// cache is the only place the Google event identifiers live.
#[async_trait]
pub trait IdentityCache: Send + Sync {
    /// Check whether a mapping exists for the given event name
    async fn exists(&self, name: &str) -> AppResult<bool>;

    /// Look up the event identifier mapped to the given name
    async fn get(&self, name: &str) -> AppResult<Option<String>>;

    /// Claim a name for an event identifier. Returns false when the
    /// name was already claimed, in which case nothing is written.
    async fn register(&self, name: &str, event_id: &str) -> AppResult<bool>;

    /// Remove the mapping for the given event name
    async fn remove(&self, name: &str) -> AppResult<()>;
}

#[async_trait]
impl IdentityCache for IdentityCacheHandle {
    async fn exists(&self, name: &str) -> AppResult<bool> {
        IdentityCacheHandle::exists(self, name).await
    }

    async fn get(&self, name: &str) -> AppResult<Option<String>> {
        IdentityCacheHandle::get(self, name).await
    }

    async fn register(&self, name: &str, event_id: &str) -> AppResult<bool> {
        IdentityCacheHandle::register(self, name, event_id).await
    }

    async fn remove(&self, name: &str) -> AppResult<()> {
        IdentityCacheHandle::remove(self, name).await
    }
}
