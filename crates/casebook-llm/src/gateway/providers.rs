//! Concrete model providers over HTTP.
//!
//! Each client sends the grounded prompt as a single user message and returns
//! the raw completion text. Errors map onto the gateway taxonomy: request
//! timeouts become [`GatewayError::Timeout`], everything else is
//! [`GatewayError::Unavailable`]; both are retried upstream by the
//! [`Gateway`](super::Gateway) wrapper.

use super::{GatewayConfig, GatewayError, LanguageModel, Provider};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to create HTTP client")
}

fn request_error(timeout_secs: u64, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(Duration::from_secs(timeout_secs))
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

// ============================================================================
// OpenAI (and OpenAI-compatible) chat completions
// ============================================================================

pub struct OpenAIClient {
    client: Client,
    config: GatewayConfig,
}

impl OpenAIClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!(
            "{}/chat/completions",
            self.config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_BASE_URL)
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(self.config.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!("{status}: {text}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid response body: {e}")))?;
        Ok(data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

// ============================================================================
// Anthropic messages
// ============================================================================

pub struct AnthropicClient {
    client: Client,
    config: GatewayConfig,
}

impl AnthropicClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config,
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(ANTHROPIC_MESSAGES_URL);
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(self.config.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!("{status}: {text}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid response body: {e}")))?;
        Ok(data["content"][0]["text"].as_str().unwrap_or("").to_string())
    }
}

// ============================================================================
// Local (Ollama, vLLM — anything OpenAI-compatible)
// ============================================================================

pub struct LocalClient {
    client: Client,
    config: GatewayConfig,
}

impl LocalClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config,
        }
    }
}

#[async_trait]
impl LanguageModel for LocalClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| GatewayError::Unavailable("no base URL configured".to_string()))?;
        let url = format!("{base_url}/v1/chat/completions");
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(self.config.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!("{status}: {text}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid response body: {e}")))?;
        Ok(data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

// ============================================================================
// Unified client
// ============================================================================

/// Dispatches to the configured provider.
pub enum UnifiedClient {
    OpenAI(OpenAIClient),
    Anthropic(AnthropicClient),
    Local(LocalClient),
}

impl UnifiedClient {
    pub fn from_config(config: GatewayConfig) -> Self {
        match config.provider {
            Provider::OpenAI => Self::OpenAI(OpenAIClient::new(config)),
            Provider::Anthropic => Self::Anthropic(AnthropicClient::new(config)),
            Provider::Local => Self::Local(LocalClient::new(config)),
        }
    }
}

#[async_trait]
impl LanguageModel for UnifiedClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        match self {
            Self::OpenAI(client) => client.complete(prompt).await,
            Self::Anthropic(client) => client.complete(prompt).await,
            Self::Local(client) => client.complete(prompt).await,
        }
    }
}
