use std::sync::Arc;

use models::user::{validate_email, Message, SavedUser, UserInput, UserList, UserRecord};
use tracing::info;

use crate::errors::ServiceError;
use crate::user::repository::UserRepository;

/// Upsert / fetch / list / delete on top of an injected [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Create or fully replace the record for `input.email`.
    /// Optional fields left out of `input` are stored as null, not merged.
    pub async fn upsert(&self, input: UserInput) -> Result<SavedUser, ServiceError> {
        input.validate()?;
        let (email, stored) = input.into_parts();
        let name = stored.name.clone();
        self.repo.upsert(email.clone(), stored).await?;
        info!(%email, "user saved");
        Ok(SavedUser { message: "User data saved successfully".into(), email, name })
    }

    pub async fn get(&self, email: &str) -> Result<UserRecord, ServiceError> {
        validate_email(email)?;
        let stored = self.repo.get(email).await?.ok_or_else(|| ServiceError::not_found("User"))?;
        Ok(UserRecord::from_stored(email.to_string(), stored))
    }

    pub async fn list(&self) -> Result<UserList, ServiceError> {
        Ok(UserList::from(self.repo.list().await?))
    }

    pub async fn delete(&self, email: &str) -> Result<Message, ServiceError> {
        validate_email(email)?;
        if !self.repo.remove(email).await? {
            return Err(ServiceError::not_found("User"));
        }
        info!(%email, "user deleted");
        Ok(Message { message: format!("User {email} deleted successfully") })
    }
}
