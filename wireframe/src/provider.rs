//! Generative text service abstraction.
//!
//! The pipeline treats the service as an opaque oracle: prompt in, free-form
//! text out, no structural guarantee. Callers must always run the result
//! through the text recovery layer. The OpenAI-compatible implementation
//! retries transient failures up to a fixed budget with no backoff; both the
//! retry count and the request timeout come from configuration.

use crate::config::LlmConfig;
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Abstract interface for generative text services
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt into free-form text at the given temperature.
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible provider (works with OpenAI-style chat-completions
/// endpoints, including proxies in front of other model families).
pub struct OpenAILlmProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAILlmProvider {
    pub fn new(config: LlmConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() {
            return Err(ProviderError::Configuration(
                "API key required for OpenAI-compatible provider".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    async fn make_request(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration("API key missing".to_string()))?;

        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1");
        let url = format!("{}/chat/completions", base_url);

        let request_body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::UnexpectedResponse(format!("{e}; body: {body}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::UnexpectedResponse("response had no choices".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAILlmProvider {
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.make_request(prompt, temperature).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "LLM request attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(ProviderError::RetriesExhausted {
            attempts,
            last_error,
        })
    }
}

/// Deterministic provider for testing. Sniffs the prompt to decide which
/// pipeline stage is calling and returns a well-formed canned payload for it.
pub struct StubLlmProvider;

impl StubLlmProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    async fn complete(&self, prompt: &str, _temperature: f64) -> Result<String, ProviderError> {
        if prompt.contains("interpreting a user's wireframe request") {
            Ok(r#"```json
{"interpreted_query": "I want to create a single screen with the components described in the request."}
```"#
                .to_string())
        } else if prompt.contains("requirements gathering agent") {
            Ok(r#"```json
{
  "project_type": "web application",
  "purpose": "stub requirements",
  "pages": ["main"],
  "fidelity_level": "low",
  "confidence_level": "high"
}
```"#
                .to_string())
        } else if prompt.contains("wireframe planning agent") {
            Ok(r#"```json
{
  "metadata": {"project_name": "stub", "fidelity_level": "low", "target_devices": ["desktop"]},
  "screens": [{"id": "main", "name": "Main", "purpose": "stub screen", "components": ["header", "content"]}]
}
```"#
                .to_string())
        } else if prompt.contains("SVG wireframe generator") {
            Ok("```svg\n<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 360 800\" width=\"100%\" height=\"100%\">\n  <g id=\"screen-main\">\n    <rect class=\"screen\" x=\"10\" y=\"10\" width=\"340\" height=\"780\"/>\n    <text class=\"screen-title\" x=\"30\" y=\"40\">Main</text>\n  </g>\n</svg>\n```"
                .to_string())
        } else {
            Ok("I am a stub provider and did not recognize this prompt.".to_string())
        }
    }
}
