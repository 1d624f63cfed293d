//! Calls from the client to the resource server.

use crate::api::{Course, CoursesResponse, MessageResponse};
use crate::client::session::SessionManager;
use crate::client::ClientError;
use serde::de::DeserializeOwned;

const NOT_OK: &str = "Network response was not ok.";

/// Resource server client that attaches the session's access token.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionManager) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub async fn public_message(&self) -> Result<String, ClientError> {
        let body: MessageResponse = self.get("/public", false).await?;
        Ok(body.message)
    }

    pub async fn private_message(&self) -> Result<String, ClientError> {
        let body: MessageResponse = self.get("/private", true).await?;
        Ok(body.message)
    }

    pub async fn courses(&self) -> Result<Vec<Course>, ClientError> {
        let body: CoursesResponse = self.get("/course", true).await?;
        Ok(body.courses)
    }

    pub async fn admin_message(&self) -> Result<String, ClientError> {
        let body: MessageResponse = self.get("/admin", true).await?;
        Ok(body.message)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, authorized: bool) -> Result<T, ClientError> {
        let mut request = self.http_client.get(format!("{}{}", self.base_url, path));
        if authorized {
            request = request.bearer_auth(self.session.get_access_token()?);
        }

        let response = request.send().await.map_err(|e| ClientError::Network {
            status: None,
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::debug!(path, status, "Resource server refused the request");
            return Err(ClientError::Network {
                status: Some(status),
                message: NOT_OK.to_string(),
            });
        }

        response.json().await.map_err(|e| ClientError::Network {
            status: None,
            message: e.to_string(),
        })
    }
}
