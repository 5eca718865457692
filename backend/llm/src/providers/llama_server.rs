use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use roundtable_core::{ChatRequest, ChatResponse, LlmProvider};

/// Default OpenAI-compatible completions endpoint of a local llama.cpp server.
pub const DEFAULT_LLAMA_SERVER_URL: &str = "http://localhost:8080/v1/chat/completions";

/// llama.cpp `llama-server` provider, speaking the OpenAI chat-completions
/// dialect plus the `grammar` extension.
pub struct LlamaServerProvider {
    client: Client,
    url: String,
}

impl LlamaServerProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for LlamaServerProvider {
    fn default() -> Self {
        Self::new(DEFAULT_LLAMA_SERVER_URL)
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for LlamaServerProvider {
    fn name(&self) -> &str {
        "llama-server"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();

        debug!(url = %self.url, model = %request.model, "Sending request to llama-server");

        let response = self
            .client
            .post(&self.url)
            .json(&request.payload())
            .send()
            .await
            .context("llama-server HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("llama-server returned {}: {}", status, error_body);
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse llama-server response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("llama-server response has no choices")?;

        Ok(ChatResponse {
            content,
            provider: "llama-server".to_string(),
            model: request.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
