use std::sync::Arc;

use tracing::{debug, info, warn};

use roundtable_core::{ChatRequest, LlmProvider, OutputGrammar, RoundtableError};

use crate::payload_log::PayloadLog;

/// Every failed call yields a string starting with this prefix.
pub const BACKEND_ERROR_PREFIX: &str = "[Error from llama-server:";

/// The model backend as seen by the turn engine.
///
/// Calls never fail: transport and server errors come back as a bracketed
/// error string, which callers treat as ordinary generated text.
pub struct ModelBackend {
    provider: Arc<dyn LlmProvider>,
    payload_log: PayloadLog,
    model: String,
    temperature: f64,
}

impl ModelBackend {
    pub fn new(provider: Arc<dyn LlmProvider>, payload_log: PayloadLog) -> Self {
        Self {
            provider,
            payload_log,
            model: "llama-chat".to_string(),
            temperature: 0.7,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Send one system+user exchange and return the trimmed reply, with
    /// failures rendered as a [`BACKEND_ERROR_PREFIX`] string.
    pub async fn send_chat_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        grammar: Option<OutputGrammar>,
        max_tokens: u32,
    ) -> String {
        match self.try_chat_completion(system_prompt, user_prompt, grammar, max_tokens).await {
            Ok(reply) => reply,
            Err(RoundtableError::Backend(detail)) => format!("{BACKEND_ERROR_PREFIX} {detail}]"),
            Err(other) => format!("{BACKEND_ERROR_PREFIX} {other}]"),
        }
    }

    /// Like [`send_chat_completion`](Self::send_chat_completion), but failures
    /// come back as [`RoundtableError::Backend`].
    ///
    /// The request payload is appended to the payload log before the call is
    /// attempted, whatever the outcome.
    pub async fn try_chat_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        grammar: Option<OutputGrammar>,
        max_tokens: u32,
    ) -> Result<String, RoundtableError> {
        let mut request = ChatRequest::new(system_prompt, user_prompt).with_max_tokens(max_tokens);
        request.model = self.model.clone();
        request.temperature = self.temperature;
        request.grammar = grammar;

        if let Err(e) = self.payload_log.record(&request.payload()).await {
            warn!(path = %self.payload_log.path().display(), error = %e, "Failed to log backend payload");
        }

        debug!(
            provider = %self.provider.name(),
            model = %request.model,
            max_tokens,
            constrained = request.grammar.is_some(),
            "Calling model backend"
        );

        match self.provider.complete(&request).await {
            Ok(response) => {
                info!(
                    provider = %response.provider,
                    latency_ms = response.latency_ms,
                    chars = response.content.len(),
                    "Backend responded"
                );
                Ok(response.content.trim().to_string())
            }
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "Backend call failed");
                Err(RoundtableError::Backend(format!("{e:#}")))
            }
        }
    }
}
