//! HTTP client for the user API that renders replies for the chat transcript.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::ChatError;

#[derive(Debug, Deserialize)]
struct SavedReply {
    email: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserReply {
    email: String,
    name: String,
    phone: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListReply {
    users: std::collections::BTreeMap<String, ListedUser>,
    count: usize,
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    message: String,
}

/// Every method returns the line to show the user; failures are folded
/// into the text instead of being returned.
#[derive(Clone)]
pub struct UserApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UserApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let base_url = Url::parse(base_url).map_err(|e| ChatError::Url(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub async fn save_user(&self, email: &str, name: &str, phone: Option<&str>, address: Option<&str>) -> String {
        fold(self.try_save_user(email, name, phone, address).await)
    }

    pub async fn get_user(&self, email: &str) -> String {
        fold(self.try_get_user(email).await)
    }

    pub async fn list_users(&self) -> String {
        fold(self.try_list_users().await)
    }

    pub async fn delete_user(&self, email: &str) -> String {
        fold(self.try_delete_user(email).await)
    }

    async fn try_save_user(
        &self,
        email: &str,
        name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<String, ChatError> {
        let body = json!({"email": email, "name": name, "phone": phone, "address": address});
        let resp = self.http.post(self.url(&["user"])?).json(&body).send().await?;
        if resp.status() == StatusCode::OK {
            let saved: SavedReply = resp.json().await?;
            Ok(format!("User saved successfully: {} ({})", saved.name, saved.email))
        } else {
            Ok(format!("Error saving user: {}", resp.text().await?))
        }
    }

    async fn try_get_user(&self, email: &str) -> Result<String, ChatError> {
        let resp = self.http.get(self.url(&["user", email])?).send().await?;
        match resp.status() {
            StatusCode::OK => {
                let u: UserReply = resp.json().await?;
                Ok(format!(
                    "User Found:\n   Name: {}\n   Email: {}\n   Phone: {}\n   Address: {}",
                    u.name,
                    u.email,
                    u.phone.as_deref().unwrap_or("N/A"),
                    u.address.as_deref().unwrap_or("N/A")
                ))
            }
            StatusCode::NOT_FOUND => Ok(format!("User with email '{email}' not found")),
            _ => Ok(format!("Error: {}", resp.text().await?)),
        }
    }

    async fn try_list_users(&self) -> Result<String, ChatError> {
        let resp = self.http.get(self.url(&["users"])?).send().await?;
        if resp.status() != StatusCode::OK {
            return Ok(format!("Error: {}", resp.text().await?));
        }
        let list: ListReply = resp.json().await?;
        if list.count == 0 {
            return Ok("No users found in the database".to_string());
        }
        let mut text = format!("Found {} users:", list.count);
        for (email, user) in &list.users {
            text.push_str(&format!("\n   {} ({})", user.name, email));
        }
        Ok(text)
    }

    async fn try_delete_user(&self, email: &str) -> Result<String, ChatError> {
        let resp = self.http.delete(self.url(&["user", email])?).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(resp.json::<MessageReply>().await?.message),
            StatusCode::NOT_FOUND => Ok(format!("User with email '{email}' not found")),
            _ => Ok(format!("Error: {}", resp.text().await?)),
        }
    }

    /// Base URL with percent-encoded segments appended.
    fn url(&self, segments: &[&str]) -> Result<Url, ChatError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ChatError::Url(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn fold(result: Result<String, ChatError>) -> String {
    result.unwrap_or_else(|e| {
        debug!(error = %e, "user api call failed");
        format!("Error: {e}")
    })
}
