// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! LLM client abstraction for the classification and scoring oracle

use async_trait::async_trait;
use memeval_core::{OracleConfig, OracleProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A structured-output request: instructions, optional user turn, and the
/// JSON schema the reply must follow.
#[derive(Debug, Clone)]
pub struct StructuredPrompt {
    pub system: String,
    pub user: Option<String>,
    /// Schema identifier (OpenAI requires `^[a-zA-Z0-9_-]+$`)
    pub schema_name: String,
    pub schema: serde_json::Value,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl StructuredPrompt {
    pub fn new(
        system: impl Into<String>,
        schema_name: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            system: system.into(),
            user: None,
            schema_name: schema_name.into(),
            schema,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for LLM clients used by the oracle
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a structured prompt and get the raw JSON text back
    async fn evaluate(&self, prompt: StructuredPrompt) -> Result<LLMResponse, LLMError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Parse response content as JSON
    pub fn as_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map a non-success status to an error, consuming the body
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LLMError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LLMError::RateLimitExceeded);
    }
    let error_text = response.text().await?;
    Err(LLMError::ApiError(format!("{}: {}", status, error_text)))
}

/// OpenAI client implementation (chat completions with strict JSON schema)
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: memeval_core::config::DEFAULT_OPENAI_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, prompt: &StructuredPrompt) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": prompt.system
        })];
        if let Some(user) = &prompt.user {
            messages.push(serde_json::json!({ "role": "user", "content": user }));
        }

        let mut request = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": prompt.schema_name,
                    "schema": prompt.schema,
                    "strict": true
                }
            }
        });
        if let Some(max_tokens) = prompt.max_tokens {
            request["max_tokens"] = max_tokens.into();
        }
        if let Some(temperature) = prompt.temperature {
            request["temperature"] = temperature.into();
        }
        request
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn evaluate(&self, prompt: StructuredPrompt) -> Result<LLMResponse, LLMError> {
        let request = self.request_body(&prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let response_data: serde_json::Value = response.json().await?;
        let message = &response_data["choices"][0]["message"];

        if let Some(refusal) = message["refusal"].as_str() {
            return Err(LLMError::InvalidResponse(format!("Model refused: {}", refusal)));
        }

        let content = message["content"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic Claude client implementation.
///
/// The messages API has no schema enforcement, so the schema is appended to
/// the system prompt and the reply is validated by the caller.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: memeval_core::config::DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, prompt: &StructuredPrompt) -> serde_json::Value {
        let system = format!(
            "{}\n\nRespond only with a JSON object matching this JSON schema:\n{}",
            prompt.system, prompt.schema
        );
        let user = prompt
            .user
            .clone()
            .unwrap_or_else(|| "Provide your answer as JSON.".to_string());

        let mut request = serde_json::json!({
            "model": self.model,
            "max_tokens": prompt.max_tokens.unwrap_or(4096),
            "system": system,
            "messages": [
                { "role": "user", "content": user }
            ]
        });
        if let Some(temperature) = prompt.temperature {
            request["temperature"] = temperature.into();
        }
        request
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn evaluate(&self, prompt: StructuredPrompt) -> Result<LLMResponse, LLMError> {
        let request = self.request_body(&prompt);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["content"][0]["text"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let input_tokens = usage_data["input_tokens"].as_u64().unwrap_or(0);
        let output_tokens = usage_data["output_tokens"].as_u64().unwrap_or(0);
        let usage = TokenUsage {
            prompt_tokens: input_tokens as u32,
            completion_tokens: output_tokens as u32,
            total_tokens: (input_tokens + output_tokens) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Build the configured provider's client
pub fn client_from_config(config: &OracleConfig) -> Arc<dyn LLMClient> {
    let base_url = config.resolved_base_url().to_string();
    match config.provider {
        OracleProvider::OpenAI => Arc::new(
            OpenAIClient::new(config.api_key.clone(), config.model.clone())
                .with_base_url(base_url),
        ),
        OracleProvider::Anthropic => Arc::new(
            AnthropicClient::new(config.api_key.clone(), config.model.clone())
                .with_base_url(base_url),
        ),
    }
}
