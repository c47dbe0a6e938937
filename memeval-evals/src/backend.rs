// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Chat backend under test
//!
//! The backend is a long-term-memory chat service reached over HTTP:
//!
//! ```text
//! POST {url}?isStream=false&isLTMemo=true
//! Authorization: Bearer {token}
//! {"prompt": "..."}            ->  {"lastMessage": "...", ...}
//! ```

use async_trait::async_trait;
use memeval_core::BackendConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Which way a backend call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Non-2xx status
    HttpStatus,
    /// Connection refused, timeout, DNS and similar
    Network,
    /// Well-formed HTTP exchange with an unusable body
    MalformedResponse,
}

/// Any failure calling the backend. Callers recover the same way from all
/// of them; the variant is kept for diagnostics.
#[derive(Debug, Error)]
pub enum BackendCallError {
    #[error("HTTP error while calling backend: {status} {message}")]
    Status { status: u16, message: String },

    #[error("Network error while calling backend: {0}")]
    Network(String),

    #[error("Invalid backend response: {0}")]
    MalformedResponse(String),
}

impl BackendCallError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendCallError::Status { .. } => BackendErrorKind::HttpStatus,
            BackendCallError::Network(_) => BackendErrorKind::Network,
            BackendCallError::MalformedResponse(_) => BackendErrorKind::MalformedResponse,
        }
    }
}

/// Chat capability of the backend under test
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one prompt and return the reply text
    async fn chat(&self, prompt: &str) -> Result<String, BackendCallError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

/// HTTP implementation of [`ChatBackend`]
pub struct HttpChatBackend {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpChatBackend {
    /// Create a backend client. A zero `timeout_secs` means no timeout.
    /// An empty `token` sends no `Authorization` header at all.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendCallError> {
        let mut builder = reqwest::Client::builder();
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendCallError::Network(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            token: token.into(),
            client,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendCallError> {
        Self::new(&config.url, &config.token, config.timeout_secs)
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat(&self, prompt: &str) -> Result<String, BackendCallError> {
        let mut request = self
            .client
            .post(&self.url)
            .query(&[("isStream", "false"), ("isLTMemo", "true")])
            .json(&ChatRequest { prompt });

        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendCallError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            return Err(BackendCallError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendCallError::Network(e.to_string()))?;
        let data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| BackendCallError::MalformedResponse(format!("Body is not JSON: {}", e)))?;

        data.get("lastMessage")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                BackendCallError::MalformedResponse(
                    "'lastMessage' not found in the API response".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const CHAT_PATH: &str = "/api/v2/brain/chat";

    fn backend(server: &mockito::ServerGuard) -> HttpChatBackend {
        HttpChatBackend::new(format!("{}{}", server.url(), CHAT_PATH), "tok", 0).unwrap()
    }

    #[tokio::test]
    async fn test_chat_returns_last_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("isStream".into(), "false".into()),
                Matcher::UrlEncoded("isLTMemo".into(), "true".into()),
            ]))
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!({"prompt": "What is my name?"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"lastMessage": "Your name is Lan.", "conversationId": "c1"}"#)
            .create_async()
            .await;

        let reply = backend(&server).chat("What is my name?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "Your name is Lan.");
    }

    #[tokio::test]
    async fn test_status_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = backend(&server).chat("hi").await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::HttpStatus);
        match err {
            BackendCallError::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_last_message_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"messages": []}"#)
            .create_async()
            .await;

        let err = backend(&server).chat("hi").await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::MalformedResponse);
        assert!(err.to_string().contains("lastMessage"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = backend(&server).chat("hi").await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        // Port 1 is reserved and nothing listens on it
        let backend = HttpChatBackend::new("http://127.0.0.1:1/chat", "", 5).unwrap();
        let err = backend.chat("hi").await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::Network);
    }

    #[tokio::test]
    async fn test_empty_token_sends_no_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"lastMessage": ""}"#)
            .create_async()
            .await;

        let backend =
            HttpChatBackend::new(format!("{}{}", server.url(), CHAT_PATH), "", 0).unwrap();
        assert_eq!(backend.chat("hi").await.unwrap(), "");
        mock.assert_async().await;
    }
}
