//! Gmail REST client — the live [`MailProvider`].
//!
//! Uses three endpoints of the Gmail v1 API:
//! - `GET  messages?q=&maxResults=` for search
//! - `GET  messages/{id}?format=full` for the MIME tree
//! - `POST messages/{id}/modify` removing the `UNREAD` label

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::GmailConfig;
use crate::error::TransportError;
use crate::mailbox::{MailProvider, Message, MessagePart, MessageRef, Payload};

const PROVIDER: &str = "gmail";

/// Gmail API client authenticated with an OAuth bearer token.
pub struct GmailClient {
    api_base: String,
    access_token: SecretString,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct FullMessage {
    id: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

impl From<FullMessage> for Message {
    fn from(full: FullMessage) -> Self {
        Message {
            id: full.id,
            payload: Payload::Structured(full.payload.unwrap_or_default()),
        }
    }
}

impl GmailClient {
    pub fn new(config: &GmailConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Request {
                provider: PROVIDER.into(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base)
    }

    /// Send a request and map non-2xx statuses to [`TransportError`].
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let resp = req
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| TransportError::Request {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(TransportError::AuthFailed {
            provider: PROVIDER.into(),
        });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status {
        provider: PROVIDER.into(),
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    })
}

fn invalid_response(e: impl std::fmt::Display) -> TransportError {
    TransportError::InvalidResponse {
        provider: PROVIDER.into(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<MessageRef>, TransportError> {
        let req = self
            .client
            .get(self.api_url("messages"))
            .query(&[("q", query.to_string()), ("maxResults", max_results.to_string())]);
        let list: ListResponse = self
            .send(req)
            .await?
            .json()
            .await
            .map_err(invalid_response)?;
        Ok(list.messages)
    }

    async fn get(&self, id: &str) -> Result<Message, TransportError> {
        let req = self
            .client
            .get(self.api_url(&format!("messages/{id}")))
            .query(&[("format", "full")]);
        let full: FullMessage = self
            .send(req)
            .await?
            .json()
            .await
            .map_err(invalid_response)?;
        Ok(full.into())
    }

    async fn mark_as_read(&self, id: &str) -> Result<(), TransportError> {
        let req = self
            .client
            .post(self.api_url(&format!("messages/{id}/modify")))
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }));
        self.send(req).await?;
        tracing::debug!(id = %id, "Marked message as read");
        Ok(())
    }
}
