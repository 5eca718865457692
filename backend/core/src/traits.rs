use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::grammar::OutputGrammar;

/// Trait for chat-completion backends driven by the turn engine.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "llama-server", "mock").
    fn name(&self) -> &str;

    /// Send a completion request and return the generated text.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Executes one agent's full turn. The scheduler drives any implementation.
#[async_trait]
pub trait TurnRunner: Send + Sync {
    /// Run every phase of `agent_id`'s turn, returning the first hard failure.
    async fn run_turn(&self, agent_id: &str) -> Result<()>;
}

/// One chat-completion request: a system and a user message plus sampling limits.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(skip)]
    pub grammar: Option<OutputGrammar>,
}

impl ChatRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model: "llama-chat".to_string(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.7,
            max_tokens: 300,
            grammar: None,
        }
    }

    pub fn with_grammar(mut self, grammar: OutputGrammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The OpenAI-compatible wire payload, including the llama.cpp `grammar` extension.
    pub fn payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": self.user_prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if let Some(grammar) = &self.grammar {
            payload["grammar"] = serde_json::Value::String(grammar.gbnf().to_string());
        }
        payload
    }
}

/// Response from a provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}
