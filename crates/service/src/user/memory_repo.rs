use std::collections::BTreeMap;

use async_trait::async_trait;
use models::user::StoredUser;
use tokio::sync::RwLock;

use crate::errors::ServiceError;
use crate::user::repository::UserRepository;

/// In-memory user repository. Nothing survives the process.
#[derive(Default)]
pub struct MemoryUserRepository {
    inner: RwLock<BTreeMap<String, StoredUser>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn upsert(&self, email: String, user: StoredUser) -> Result<(), ServiceError> {
        self.inner.write().await.insert(email, user);
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<StoredUser>, ServiceError> {
        Ok(self.inner.read().await.get(email).cloned())
    }

    async fn list(&self) -> Result<BTreeMap<String, StoredUser>, ServiceError> {
        Ok(self.inner.read().await.clone())
    }

    async fn remove(&self, email: &str) -> Result<bool, ServiceError> {
        Ok(self.inner.write().await.remove(email).is_some())
    }
}
