use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use models::user::StoredUser;

use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;
use crate::user::repository::UserRepository;

/// File-backed user repository.
/// Keeps a map of `email -> {name, phone, address}` persisted as one JSON document.
#[derive(Clone)]
pub struct FileUserRepository {
    store: Arc<JsonMapStore<String, StoredUser>>,
}

impl FileUserRepository {
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonMapStore::<String, StoredUser>::new(path).await?;
        Ok(Arc::new(Self { store }))
    }

    pub fn path(&self) -> &std::path::Path {
        self.store.path()
    }
}

#[async_trait]
impl UserRepository for FileUserRepository {
    async fn upsert(&self, email: String, user: StoredUser) -> Result<(), ServiceError> {
        self.store.insert(email, user).await.map(|_| ())
    }

    async fn get(&self, email: &str) -> Result<Option<StoredUser>, ServiceError> {
        self.store.get(&email.to_string()).await
    }

    async fn list(&self) -> Result<BTreeMap<String, StoredUser>, ServiceError> {
        self.store.load().await
    }

    async fn remove(&self, email: &str) -> Result<bool, ServiceError> {
        self.store.remove(&email.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(name: &str) -> StoredUser {
        StoredUser { name: name.into(), phone: None, address: None }
    }

    #[tokio::test]
    async fn file_repo_basic_crud() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("svc_users_{}.json", Uuid::new_v4()));
        let repo = FileUserRepository::new(&tmp).await?;

        assert!(repo.list().await?.is_empty());

        repo.upsert("a@x.com".into(), user("A")).await?;
        repo.upsert("b@x.com".into(), user("B")).await?;
        assert_eq!(repo.list().await?.len(), 2);
        assert_eq!(repo.get("a@x.com").await?, Some(user("A")));

        assert!(repo.remove("a@x.com").await?);
        assert!(!repo.remove("a@x.com").await?);

        // reload from disk to ensure persistence
        let repo2 = FileUserRepository::new(&tmp).await?;
        let all = repo2.list().await?;
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["b@x.com"]);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn document_layout_is_email_keyed_object() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("svc_users_layout_{}.json", Uuid::new_v4()));
        let repo = FileUserRepository::new(&tmp).await?;
        repo.upsert(
            "a@x.com".into(),
            StoredUser { name: "A".into(), phone: Some("1".into()), address: None },
        )
        .await?;

        let raw: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&tmp).await?)?;
        assert_eq!(raw, serde_json::json!({"a@x.com": {"name": "A", "phone": "1", "address": null}}));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn reads_documents_written_by_other_tools() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("svc_users_foreign_{}.json", Uuid::new_v4()));
        tokio::fs::write(&tmp, br#"{"z@x.com": {"name": "Z"}}"#).await?;
        let repo = FileUserRepository::new(&tmp).await?;

        assert_eq!(repo.get("z@x.com").await?, Some(user("Z")));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
