use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ModelError;

/// Body of `POST /user`.
///
/// `email` and `name` default to empty strings when the field is missing so
/// the request reaches validation and fails there with a readable message
/// instead of a deserialisation rejection.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UserInput {
    /// Email address; the record key
    #[serde(default)]
    #[schema(required = true)]
    pub email: String,
    #[serde(default)]
    #[schema(required = true)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl UserInput {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self { email: email.into(), name: name.into(), phone: None, address: None }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        validate_email(&self.email)?;
        validate_name(&self.name)
    }

    /// Split into the document key and the stored value.
    pub fn into_parts(self) -> (String, StoredUser) {
        (self.email, StoredUser { name: self.name, phone: self.phone, address: self.address })
    }
}

/// Value stored under an email key in the backing document.
/// Absent optional fields are written as `null`, never omitted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct StoredUser {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A stored user joined back with its key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl UserRecord {
    pub fn from_stored(email: String, stored: StoredUser) -> Self {
        Self { email, name: stored.name, phone: stored.phone, address: stored.address }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SavedUser {
    pub message: String,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UserList {
    pub users: BTreeMap<String, StoredUser>,
    pub count: usize,
}

impl From<BTreeMap<String, StoredUser>> for UserList {
    fn from(users: BTreeMap<String, StoredUser>) -> Self {
        let count = users.len();
        Self { users, count }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Message {
    pub message: String,
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if email.trim().is_empty() {
        return Err(ModelError::Validation("email required".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("name required".into()));
    }
    Ok(())
}
