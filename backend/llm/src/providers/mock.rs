use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use roundtable_core::{ChatRequest, ChatResponse, LlmProvider};

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String> + Send + Sync>;

/// A mock LLM provider with scripted replies.
///
/// Queued replies are served first, then the responder, then the fixed
/// response. Every request is recorded for inspection.
pub struct MockProvider {
    name: String,
    queued: Mutex<VecDeque<Result<String, String>>>,
    responder: Option<Responder>,
    fixed_response: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queued: Mutex::new(VecDeque::new()),
            responder: None,
            fixed_response: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_responder(
        mut self,
        responder: impl Fn(&ChatRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_queue().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, error: impl Into<String>) {
        self.lock_queue().push_back(Err(error.into()));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.queued.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        let queued = self.lock_queue().pop_front();
        let content = match queued {
            Some(Ok(reply)) => reply,
            Some(Err(error)) => anyhow::bail!(error),
            None => match &self.responder {
                Some(responder) => responder(request)?,
                None => self
                    .fixed_response
                    .clone()
                    .unwrap_or_else(|| "Mock response".to_string()),
            },
        };

        Ok(ChatResponse {
            content,
            provider: self.name.clone(),
            model: "mock".to_string(),
            latency_ms: 0,
        })
    }
}
