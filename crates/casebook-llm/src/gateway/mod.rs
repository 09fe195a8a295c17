//! The language-model gateway.
//!
//! The model is an untrusted oracle behind a capability trait: it may return
//! malformed, irrelevant, or adversarial text, may be slow, and may fail
//! transiently. Callers never execute what it returns — completions go to
//! the validator. The [`Gateway`] wrapper owns the timeout and the bounded
//! retry so trait implementations stay plain HTTP clients, and so tests can
//! swap in a deterministic stub without touching the pipeline.

pub mod providers;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The model did not answer within the deadline. Retryable.
    #[error("gateway timeout after {0:?}")]
    Timeout(Duration),
    /// The model endpoint failed or returned garbage transport-level data.
    /// Retryable.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface: a prompt string in, a completion string out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Local,
}

/// Gateway configuration, usually resolved from the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl GatewayConfig {
    /// Load from environment variables, first provider found wins.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            return Ok(Self {
                provider: Provider::OpenAI,
                api_key: key,
                model: std::env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                base_url: std::env::var("OPENAI_BASE_URL").ok(),
                timeout_secs: 60,
                max_retries: 3,
            });
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Ok(Self {
                provider: Provider::Anthropic,
                api_key: key,
                model: std::env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-3-5-haiku-latest".to_string()),
                base_url: std::env::var("ANTHROPIC_BASE_URL").ok(),
                timeout_secs: 60,
                max_retries: 3,
            });
        }

        if let Ok(url) = std::env::var("LOCAL_LLM_URL") {
            return Ok(Self {
                provider: Provider::Local,
                api_key: String::new(),
                model: std::env::var("LOCAL_LLM_MODEL").unwrap_or_else(|_| "default".to_string()),
                base_url: Some(url),
                timeout_secs: 120,
                max_retries: 1,
            });
        }

        Err(ConfigError::NoProviderConfigured)
    }

    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::OpenAI,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
            max_retries: 3,
        }
    }

    pub fn anthropic(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::Anthropic,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
            max_retries: 3,
        }
    }

    pub fn local(url: &str, model: &str) -> Self {
        Self {
            provider: Provider::Local,
            api_key: String::new(),
            model: model.to_string(),
            base_url: Some(url.to_string()),
            timeout_secs: 120,
            max_retries: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "no model provider configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or LOCAL_LLM_URL"
    )]
    NoProviderConfigured,
}

/// Timeout + bounded-retry wrapper around any [`LanguageModel`].
pub struct Gateway {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
    max_attempts: u32,
}

impl Gateway {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            timeout: Duration::from_secs(60),
            max_attempts: 3,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            model: Arc::new(providers::UnifiedClient::from_config(config.clone())),
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_retries.max(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Complete a prompt, retrying timeouts and unavailability up to the
    /// attempt bound before surfacing the last error.
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let mut last = GatewayError::Unavailable("no attempts made".to_string());
        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, self.model.complete(prompt)).await {
                Ok(Ok(completion)) => return Ok(completion),
                Ok(Err(err)) => {
                    tracing::warn!(attempt, error = %err, "gateway call failed");
                    last = err;
                }
                Err(_) => {
                    let err = GatewayError::Timeout(self.timeout);
                    tracing::warn!(attempt, error = %err, "gateway call timed out");
                    last = err;
                }
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times, then answers.
    struct FlakyModel {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LanguageModel for FlakyModel {
        async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(GatewayError::Unavailable("connection reset".to_string()))
            } else {
                Ok("SELECT * FROM customer_information".to_string())
            }
        }
    }

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_within_bound() {
        let model = Arc::new(FlakyModel {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let gateway = Gateway::new(Arc::clone(&model) as Arc<dyn LanguageModel>);
        let completion = gateway.complete("prompt").await.unwrap();
        assert_eq!(completion, "SELECT * FROM customer_information");
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_failure_after_exhausting_attempts() {
        let model = Arc::new(FlakyModel {
            failures: 5,
            calls: AtomicU32::new(0),
        });
        let gateway =
            Gateway::new(Arc::clone(&model) as Arc<dyn LanguageModel>).with_max_attempts(2);
        let err = gateway.complete("prompt").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let gateway = Gateway::new(Arc::new(SlowModel))
            .with_timeout(Duration::from_millis(20))
            .with_max_attempts(1);
        let err = gateway.complete("prompt").await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
    }
}
