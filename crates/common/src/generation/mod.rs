//! Text generation providers
//!
//! Provides:
//! - A provider-agnostic `Generator` trait (one call, no streaming)
//! - An OpenAI-compatible chat completions client
//! - A deterministic mock that records every request

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for single-shot text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Issue exactly one generation call and return the raw text
    async fn complete(&self, system_instruction: &str, context: &str, input: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// One generation call as seen by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub context: String,
    pub input: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl OpenAIChatGenerator {
    /// Create a new generator from configuration
    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    async fn call_llm(&self, system: &str, input: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: input },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ProviderTimeout {
                        provider: self.model.clone(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::provider(&self.model, format!("LLM API request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::provider(&self.model, format!("LLM API error {}: {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider(&self.model, format!("Failed to parse LLM response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::provider(&self.model, "Empty response from LLM"))
    }
}

/// Render the system message: instruction first, then the retrieved context.
pub fn system_message(system_instruction: &str, context: &str) -> String {
    format!("{}\n\ncontext:\n{}", system_instruction, context)
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    async fn complete(&self, system_instruction: &str, context: &str, input: &str) -> Result<String> {
        let system = system_message(system_instruction, context);
        let started = Instant::now();
        let result = self.call_llm(&system, input).await;
        metrics::record_generation(started.elapsed().as_secs_f64(), &self.model, result.is_ok());

        if let Err(e) = &result {
            tracing::warn!(model = %self.model, error = %e, "Generation request failed");
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock generator for development and tests.
///
/// Replies with a fixed text (or a summary of the request) and keeps every request.
pub struct MockGenerator {
    reply: Option<String>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub const MODEL_NAME: &'static str = "mock-generator";

    pub fn new() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `reply`
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in call order
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, system_instruction: &str, context: &str, input: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(GenerationRequest {
                system_instruction: system_instruction.to_string(),
                context: context.to_string(),
                input: input.to_string(),
            });

        Ok(self.reply.clone().unwrap_or_else(|| {
            let topic = input.lines().next().unwrap_or_default();
            format!(
                "Based on {} context block(s): {}\n\n[Mock response - LLM API key not configured]",
                context.split("\n\n").filter(|b| !b.trim().is_empty()).count(),
                topic
            )
        }))
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AppError::configuration("generation API key required for provider `openai`"))?;
            Ok(Arc::new(OpenAIChatGenerator::new(key, config)?))
        }
        "mock" => Ok(Arc::new(MockGenerator::new())),
        other => Err(AppError::configuration(format!("unknown generation provider `{}`", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_requests() {
        let generator = MockGenerator::with_reply("ok");
        let answer = generator.complete("be grounded", "ctx", "question").await.unwrap();
        assert_eq!(answer, "ok");

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system_instruction, "be grounded");
        assert_eq!(calls[0].context, "ctx");
        assert_eq!(calls[0].input, "question");
    }

    #[tokio::test]
    async fn test_mock_default_reply_counts_blocks() {
        let generator = MockGenerator::new();
        let answer = generator.complete("sys", "a\n\nb", "what?").await.unwrap();
        assert!(answer.starts_with("Based on 2 context block(s): what?"));
    }

    #[test]
    fn test_system_message_layout() {
        assert_eq!(system_message("rule", "facts"), "rule\n\ncontext:\nfacts");
    }

    #[test]
    fn test_openai_requires_key() {
        let config = GenerationConfig::default();
        assert!(matches!(create_generator(&config), Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_mock_provider_selected() {
        let config = GenerationConfig {
            provider: "mock".into(),
            ..GenerationConfig::default()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.model_name(), MockGenerator::MODEL_NAME);
    }
}
