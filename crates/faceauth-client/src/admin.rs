use faceauth_types::{config::ApiConfig, FaceAuthError, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{build_http, network_error, normalize_base, ReplyBody, DELETE_PATH, USERS_PATH};

#[derive(Debug, Deserialize)]
struct UsersReply {
    #[serde(default)]
    users: Vec<String>,
}

/// Plain calls against the enrolled-user list.
#[derive(Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: build_http(config)?,
            base_url: normalize_base(&config.base_url)?,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<String>> {
        let url = format!("{}{}", self.base_url, USERS_PATH);
        let response = self.http.get(&url).send().await.map_err(|err| {
            warn!("User list request to {} failed: {}", url, err);
            network_error("Unable to reach the face authentication service.")
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        if !(200..300).contains(&status) {
            return Err(api_error(status, &body, "Listing users failed"));
        }
        let reply: UsersReply = serde_json::from_slice(&body).map_err(|err| FaceAuthError::Api {
            status,
            message: format!("Unexpected user list reply: {err}"),
        })?;
        Ok(reply.users)
    }

    /// Deletes one enrolled user. Returns the backend's acknowledgement text.
    pub async fn delete_user(&self, user_id: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, DELETE_PATH);
        let response = self
            .http
            .delete(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(|err| {
                warn!("Delete request for {} failed: {}", user_id, err);
                network_error("Unable to reach the face authentication service.")
            })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        if !(200..300).contains(&status) {
            return Err(api_error(status, &body, "Deleting user failed"));
        }
        let reply = ReplyBody::parse(&body);
        Ok(reply
            .message
            .unwrap_or_else(|| format!("User '{user_id}' deleted")))
    }
}

fn api_error(status: u16, body: &[u8], fallback: &str) -> FaceAuthError {
    let reply = ReplyBody::parse(body);
    let message = reply
        .error
        .or(reply.message)
        .unwrap_or_else(|| format!("{fallback} with status {status}"));
    FaceAuthError::Api { status, message }
}

/// Local copy of the user list. A delete updates it in place after the
/// backend acknowledges, without fetching the list again.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: Vec<String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub async fn refresh(&mut self, client: &AdminClient) -> Result<&[String]> {
        self.users = client.list_users().await?;
        info!("Loaded {} enrolled users", self.users.len());
        Ok(&self.users)
    }

    pub async fn delete(&mut self, client: &AdminClient, user_id: &str) -> Result<String> {
        let ack = client.delete_user(user_id).await?;
        self.users.retain(|user| user != user_id);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    #[tokio::test]
    async fn delete_removes_user_without_refetch() {
        let backend = MockBackend::spawn().await;
        backend.enroll_user("u1", "Alice");
        backend.enroll_user("u3", "Carol");
        let client = AdminClient::new(&ApiConfig {
            base_url: backend.base_url(),
            ..ApiConfig::default()
        })
        .expect("client");

        let mut directory = UserDirectory::new();
        directory.refresh(&client).await.expect("refresh");
        assert_eq!(directory.users().to_vec(), vec!["u1".to_string(), "u3".to_string()]);

        let ack = directory.delete(&client, "u3").await.expect("delete");
        assert_eq!(ack, "User 'u3' deleted");
        assert_eq!(directory.users().to_vec(), vec!["u1".to_string()]);
        assert_eq!(backend.users(), vec!["u1".to_string()]);

        let list_calls = backend
            .requests()
            .iter()
            .filter(|r| r.path == USERS_PATH)
            .count();
        assert_eq!(list_calls, 1);
    }

    #[tokio::test]
    async fn deleting_unknown_user_keeps_local_list() {
        let backend = MockBackend::spawn().await;
        backend.enroll_user("u1", "Alice");
        let client = AdminClient::new(&ApiConfig {
            base_url: backend.base_url(),
            ..ApiConfig::default()
        })
        .expect("client");

        let mut directory = UserDirectory::new();
        directory.refresh(&client).await.expect("refresh");
        let err = directory
            .delete(&client, "ghost")
            .await
            .expect_err("unknown user");
        assert_eq!(err.user_message(), "User not found");
        assert_eq!(directory.users().to_vec(), vec!["u1".to_string()]);
    }
}
