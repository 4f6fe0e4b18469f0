//! Ollama LLM provider adapter.
//!
//! One concrete, network-calling [`LlmProvider`] implementation: Ollama's
//! OpenAI-compatible `/api/chat` endpoint, narrowed to the single-shot
//! `generate` surface this pipeline needs rather than a full streaming
//! chat API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SummarizerError, SummarizerResult};

use super::provider::LlmProvider;
use super::types::GenerationOptions;

pub struct OllamaLlmProvider {
    model: String,
    endpoint: String,
    context_window: u32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

impl OllamaLlmProvider {
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            endpoint: endpoint.into(),
            context_window: 8192,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_context_window(mut self, context_window: u32) -> Self {
        self.context_window = context_window;
        self
    }

    fn messages_for(&self, prompt: &str, options: &GenerationOptions) -> Vec<OllamaMessage> {
        let mut messages = Vec::new();
        if let Some(system) = &options.system_prompt {
            messages.push(OllamaMessage { role: "system".to_string(), content: system.clone() });
        }
        messages.push(OllamaMessage { role: "user".to_string(), content: prompt.to_string() });
        messages
    }

    /// Probes `/api/tags`, the cheapest Ollama endpoint that confirms the
    /// daemon is up without loading a model.
    pub async fn check_server(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        matches!(self.client.get(&url).send().await, Ok(resp) if resp.status().is_success())
    }
}

#[async_trait]
impl LlmProvider for OllamaLlmProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> SummarizerResult<String> {
        let url = format!("{}/api/chat", self.endpoint);
        let model = options.model.as_deref().unwrap_or(&self.model);

        let request = OllamaChatRequest {
            model,
            messages: self.messages_for(prompt, options),
            options: OllamaOptions {
                temperature: Some(options.temperature),
                num_predict: options.max_tokens.map(|t| t as i32),
            },
            stream: false,
        };

        debug!(model, "sending generation request to ollama");
        info!(endpoint = %self.endpoint, "ollama generate");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizerError::ExternalUnavailable(format!("ollama unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::ExternalUnavailable(format!(
                "ollama request failed with status {status}: {body}"
            )));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::Internal(format!("failed to parse ollama response: {e}")))?;

        Ok(parsed.message.content)
    }

    async fn is_available(&self) -> bool {
        self.check_server().await
    }

    fn context_window(&self) -> u32 {
        self.context_window
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
