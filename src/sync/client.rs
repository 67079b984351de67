//! Transport adapter for the console backend API.
//!
//! One method per remote capability, plain data in and out. Retry policy
//! belongs to callers; the adapter only classifies failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use super::config::SyncConfig;
use super::error::SyncError;
use super::types::{Conversation, Message, PeerId, PollEvent, SendReceipt, UnreadResource};

/// Remote capabilities of the console backend.
///
/// Every call carries the operator bearer credential. All calls are
/// idempotent from the adapter's point of view except [`send_message`].
///
/// [`send_message`]: ChatTransport::send_message
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Fetch the conversation list, optionally restricted to unread ones.
    async fn conversations(&self, unread_only: bool) -> Result<Vec<Conversation>, SyncError>;

    /// Fetch the full message history of one conversation.
    async fn messages(&self, peer: &PeerId) -> Result<Vec<Message>, SyncError>;

    /// Send an outgoing message; returns the authoritative server id.
    async fn send_message(&self, peer: &PeerId, text: &str) -> Result<SendReceipt, SyncError>;

    /// Mark all of a conversation's messages as read by the operator.
    async fn mark_as_read(&self, peer: &PeerId) -> Result<(), SyncError>;

    /// Delete a conversation from the backend store.
    async fn delete_conversation(&self, peer: &PeerId) -> Result<(), SyncError>;

    /// Long-poll for new messages, held open server-side up to `wait`.
    async fn wait_for_messages(&self, wait: Duration) -> Result<PollEvent, SyncError>;

    /// Fetch the unread total for one resource.
    async fn unread_count(&self, resource: UnreadResource) -> Result<u64, SyncError>;
}

/// Count payload of the unread endpoint.
#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// `reqwest`-backed implementation of [`ChatTransport`].
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    bearer_token: String,
    long_poll_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from the sync configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be created.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let base = Url::parse(&config.base_url)?;
        let client = Self::build_client(config)?;
        Ok(Self {
            client,
            base,
            bearer_token: config.bearer_token.clone(),
            long_poll_timeout: config.long_poll_timeout(),
        })
    }

    /// Build an HTTP client with appropriate headers and timeouts.
    fn build_client(config: &SyncConfig) -> Result<reqwest::Client, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| SyncError::Client(e.to_string()))
    }

    /// Join path segments onto the configured base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| SyncError::Client("base URL cannot hold a path".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }
}

/// Classify a response: 2xx passes through, 401/403 is an auth rejection,
/// any other status becomes a server error with the body as detail.
async fn checked(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    if code == 401 || code == 403 {
        return Err(SyncError::Auth { status: code });
    }
    let detail = response.text().await.unwrap_or_default();
    Err(SyncError::Server {
        status: code,
        detail,
    })
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn conversations(&self, unread_only: bool) -> Result<Vec<Conversation>, SyncError> {
        let mut url = self.endpoint(&["api", "conversations"])?;
        url.query_pairs_mut()
            .append_pair("unreadOnly", if unread_only { "true" } else { "false" });
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn messages(&self, peer: &PeerId) -> Result<Vec<Message>, SyncError> {
        let url = self.endpoint(&["api", "conversations", peer.as_str(), "messages"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn send_message(&self, peer: &PeerId, text: &str) -> Result<SendReceipt, SyncError> {
        let url = self.endpoint(&["api", "conversations", peer.as_str(), "messages"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.bearer_token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn mark_as_read(&self, peer: &PeerId) -> Result<(), SyncError> {
        let url = self.endpoint(&["api", "conversations", peer.as_str(), "read"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn delete_conversation(&self, peer: &PeerId) -> Result<(), SyncError> {
        let url = self.endpoint(&["api", "conversations", peer.as_str()])?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn wait_for_messages(&self, wait: Duration) -> Result<PollEvent, SyncError> {
        let mut url = self.endpoint(&["api", "messages", "wait"])?;
        url.query_pairs_mut()
            .append_pair("timeoutSeconds", &wait.as_secs().to_string());
        // The long poll is expected to block; its budget overrides the
        // client's ordinary request timeout.
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .timeout(self.long_poll_timeout)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    async fn unread_count(&self, resource: UnreadResource) -> Result<u64, SyncError> {
        let url = self.endpoint(&["api", "unread", resource.as_str()])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        let payload: CountResponse = checked(response).await?.json().await?;
        Ok(payload.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Option<HttpTransport> {
        let config = SyncConfig::new()
            .with_base_url("http://127.0.0.1:9999/console")
            .with_bearer_token("token");
        HttpTransport::new(&config).ok()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let url = transport()
            .and_then(|t| t.endpoint(&["api", "conversations", "p-1", "messages"]).ok())
            .map(|u| u.to_string());
        assert_eq!(
            url,
            Some("http://127.0.0.1:9999/console/api/conversations/p-1/messages".to_string())
        );
    }

    #[test]
    fn test_transport_rejects_invalid_base_url() {
        let config = SyncConfig::new().with_base_url("not a url");
        assert!(HttpTransport::new(&config).is_err());
    }

    #[test]
    fn test_long_poll_timeout_carries_margin() {
        let config = SyncConfig::default();
        let built = HttpTransport::new(&config).ok();
        assert_eq!(
            built.map(|t| t.long_poll_timeout),
            Some(config.long_poll_timeout())
        );
    }
}
