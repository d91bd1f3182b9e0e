use std::collections::BTreeMap;

use async_trait::async_trait;
use models::user::StoredUser;

use crate::errors::ServiceError;

/// Trait abstraction for user record storage.
/// Implementations can be file-backed, in-memory, or a transactional KV engine.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create or fully replace the record stored under `email`.
    async fn upsert(&self, email: String, user: StoredUser) -> Result<(), ServiceError>;
    async fn get(&self, email: &str) -> Result<Option<StoredUser>, ServiceError>;
    async fn list(&self) -> Result<BTreeMap<String, StoredUser>, ServiceError>;
    /// Returns whether a record existed.
    async fn remove(&self, email: &str) -> Result<bool, ServiceError>;
}
