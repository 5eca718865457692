//! Three-phase turn engine.
//!
//! A turn is `Hcall -> Dcall -> Rcall -> Done`. Transitions are unconditional:
//! a malformed or failed phase output is still persisted and the next phase
//! runs on whatever is on disk. Only storage errors abort a turn.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use logging::{EventLogger, TurnEvent};
use roundtable_config::ConfigLoader;
use roundtable_core::{
    DecisionChoice, Layout, LlmProvider, OutputGrammar, Phase, RoundtableError, SILENCE,
    TurnRunner,
};
use roundtable_llm::{ModelBackend, PayloadLog, BACKEND_ERROR_PREFIX};
use roundtable_memory::{ArtifactStore, ConversationMemory};

use crate::decision::{parse_decision, resolve_directive};
use crate::prompts::{
    decide_system_prompt, decide_user_prompt, format_response, respond_system_prompt,
    summarize_system_prompt, SUMMARIZE_USER_PROMPT,
};

pub const DEFAULT_MAX_TOKENS: u32 = 1000;

fn storage(e: anyhow::Error) -> RoundtableError {
    RoundtableError::Storage(format!("{e:#}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Hcall,
    Dcall,
    Rcall,
    Done,
}

impl TurnState {
    pub fn next(self) -> Self {
        match self {
            TurnState::Hcall => TurnState::Dcall,
            TurnState::Dcall => TurnState::Rcall,
            TurnState::Rcall | TurnState::Done => TurnState::Done,
        }
    }
}

/// What one completed turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutput {
    pub agent_id: String,
    pub summary: String,
    pub decision: String,
    pub choice: Option<DecisionChoice>,
    /// The block appended to the conversation, heading and rule included.
    pub response: String,
}

impl TurnOutput {
    fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            summary: String::new(),
            decision: String::new(),
            choice: None,
            response: String::new(),
        }
    }
}

pub struct TurnEngine {
    config: ConfigLoader,
    memory: ConversationMemory,
    artifacts: ArtifactStore,
    backend: ModelBackend,
    max_tokens: u32,
}

impl TurnEngine {
    pub fn new(
        config: ConfigLoader,
        memory: ConversationMemory,
        artifacts: ArtifactStore,
        backend: ModelBackend,
    ) -> Self {
        Self {
            config,
            memory,
            artifacts,
            backend,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Wire an engine onto the standard on-disk layout.
    pub fn for_layout(layout: &Layout, backend: ModelBackend) -> Self {
        Self::new(
            ConfigLoader::new(layout.clone()),
            ConversationMemory::new(layout.conversation_path()),
            ArtifactStore::new(layout.clone()),
            backend,
        )
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Run all three phases for one agent.
    #[instrument(skip(self), fields(max_tokens = self.max_tokens))]
    pub async fn execute(&self, agent_id: &str) -> Result<TurnOutput> {
        let mut output = TurnOutput::new(agent_id);
        let mut state = TurnState::Hcall;

        while state != TurnState::Done {
            match state {
                TurnState::Hcall => output.summary = self.hcall(agent_id).await?,
                TurnState::Dcall => output.decision = self.dcall(agent_id).await?,
                TurnState::Rcall => {
                    let (choice, block) = self.rcall(agent_id).await?;
                    output.choice = Some(choice);
                    output.response = block;
                }
                TurnState::Done => {}
            }
            state = state.next();
        }

        Ok(output)
    }

    /// Summarize the conversation and persist the summary.
    pub async fn hcall(&self, agent_id: &str) -> Result<String> {
        let agent = self.config.load(agent_id).await;
        let conversation = self.memory.read().await.map_err(storage)?;

        let grammar = OutputGrammar::summary();
        let summary = self
            .backend
            .send_chat_completion(
                &summarize_system_prompt(&agent, &conversation),
                SUMMARIZE_USER_PROMPT,
                Some(grammar.clone()),
                self.max_tokens,
            )
            .await;
        self.check_grammar(agent_id, Phase::Hcall, &grammar, &summary);

        info!(agent = %agent_id, "[H-CALL] summarized:\n{summary}");
        self.persist(agent_id, Phase::Hcall, &summary).await?;
        Ok(summary)
    }

    /// Privately decide mood and next move, and persist the decision record.
    pub async fn dcall(&self, agent_id: &str) -> Result<String> {
        let agent = self.config.load(agent_id).await;
        let summary = self.artifacts.latest_of(agent_id, Phase::Hcall).await.map_err(storage)?;
        let conversation = self.memory.read().await.map_err(storage)?;

        let grammar = OutputGrammar::decision();
        let decision = self
            .backend
            .send_chat_completion(
                &decide_system_prompt(&agent, &summary, &conversation),
                &decide_user_prompt(),
                Some(grammar.clone()),
                self.max_tokens,
            )
            .await;
        self.check_grammar(agent_id, Phase::Dcall, &grammar, &decision);

        info!(agent = %agent_id, "[D-CALL] decision:\n{decision}");
        self.persist(agent_id, Phase::Dcall, &decision).await?;
        Ok(decision)
    }

    /// Speak into the conversation following the latest decision.
    ///
    /// Returns the choice that was acted on and the appended block.
    pub async fn rcall(&self, agent_id: &str) -> Result<(DecisionChoice, String)> {
        let agent = self.config.load(agent_id).await;
        let summary = self.artifacts.latest_of(agent_id, Phase::Hcall).await.map_err(storage)?;
        let decision = self.artifacts.latest_of(agent_id, Phase::Dcall).await.map_err(storage)?;
        let parsed = parse_decision(&decision);
        let directive = resolve_directive(&parsed);
        let conversation = self.memory.read().await.map_err(storage)?;

        let reply = self
            .backend
            .send_chat_completion(
                &respond_system_prompt(&agent, &summary, &conversation, &parsed.mood),
                directive.text,
                None,
                self.max_tokens,
            )
            .await;

        let body = if directive.choice == DecisionChoice::Silence {
            SILENCE
        } else {
            reply.as_str()
        };
        let block = format_response(&agent.display_name, body);

        self.memory.append(&block).await.map_err(storage)?;
        info!(
            agent = %agent_id,
            choice = %directive.choice,
            mood = parsed.mood().map_or("unknown", |m| m.as_str()),
            "[R-CALL] replied with:\n{body}"
        );
        self.persist(agent_id, Phase::Rcall, &block).await?;
        Ok((directive.choice, block))
    }

    async fn persist(&self, agent_id: &str, phase: Phase, text: &str) -> Result<()> {
        let artifact = self.artifacts.append(agent_id, phase, text).await.map_err(storage)?;
        EventLogger::log_event(TurnEvent::PhaseCompleted {
            agent: agent_id.to_string(),
            phase,
            chars: artifact.text.chars().count(),
        });
        Ok(())
    }

    fn check_grammar(&self, agent_id: &str, phase: Phase, grammar: &OutputGrammar, text: &str) {
        // Backend failures are reported where they happen.
        if text.starts_with(BACKEND_ERROR_PREFIX) {
            return;
        }
        if let Err(violation) = grammar.validate(text) {
            EventLogger::log_event(TurnEvent::GrammarViolation {
                agent: agent_id.to_string(),
                phase,
                reason: violation.to_string(),
            });
        }
    }
}

#[async_trait]
impl TurnRunner for TurnEngine {
    async fn run_turn(&self, agent_id: &str) -> Result<()> {
        self.execute(agent_id).await.map(|_| ())
    }
}

/// Engine over `layout` whose backend logs payloads to the layout's payload log.
pub fn engine_for(layout: &Layout, provider: Arc<dyn LlmProvider>) -> TurnEngine {
    let backend = ModelBackend::new(provider, PayloadLog::new(layout.payload_log_path()));
    TurnEngine::for_layout(layout, backend)
}

#[cfg(test)]
mod tests {
    use roundtable_core::{ChatRequest, GrammarKind, NO_ARTIFACT};
    use roundtable_llm::MockProvider;

    use super::*;

    const SUMMARY: &str = "Overall Summary: Two friends are chatting about the weather.";

    fn decision(choice: &str) -> String {
        format!(
            "mood: Curious\nreflection: I wonder where this is going.\nchoice: {choice}\n\
             justification: It keeps the talk moving."
        )
    }

    fn phase_aware(choice: &'static str, reply: &'static str) -> MockProvider {
        MockProvider::new("mock").with_responder(move |req: &ChatRequest| {
            Ok(match req.grammar.as_ref().map(|g| g.kind()) {
                Some(GrammarKind::Summary) => SUMMARY.to_string(),
                Some(GrammarKind::Decision) => decision(choice),
                None => reply.to_string(),
            })
        })
    }

    fn setup(provider: Arc<MockProvider>) -> (tempfile::TempDir, Layout, TurnEngine) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let engine = engine_for(&layout, provider).with_max_tokens(64);
        (tmp, layout, engine)
    }

    async fn write_config(layout: &Layout, agent: &str, yaml: &str) {
        let path = layout.config_path(agent);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, yaml).await.unwrap();
    }

    #[test]
    fn states_advance_to_done() {
        let mut state = TurnState::Hcall;
        let mut seen = vec![state];
        while state != TurnState::Done {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![TurnState::Hcall, TurnState::Dcall, TurnState::Rcall, TurnState::Done]
        );
        assert_eq!(TurnState::Done.next(), TurnState::Done);
    }

    #[tokio::test]
    async fn full_turn_persists_all_three_phases() {
        let mock = Arc::new(phase_aware("Ask", "What do you make of the rain?"));
        let (_tmp, layout, engine) = setup(mock.clone());
        write_config(&layout, "ada", "name: Ada\npersona: A patient mathematician\n").await;

        let output = engine.execute("ada").await.unwrap();
        assert_eq!(output.choice, Some(DecisionChoice::Ask));
        assert_eq!(output.response, "### ADA\n\nWhat do you make of the rain?\n\n---");

        let memory = engine.memory().read().await.unwrap();
        assert_eq!(memory, "### ADA\n\nWhat do you make of the rain?\n\n---\n");

        let artifacts = ArtifactStore::new(layout.clone());
        assert_eq!(artifacts.latest_of("ada", Phase::Hcall).await.unwrap(), SUMMARY);
        assert_eq!(artifacts.latest_of("ada", Phase::Dcall).await.unwrap(), decision("Ask"));
        assert_eq!(artifacts.latest_of("ada", Phase::Rcall).await.unwrap(), output.response);

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].user_prompt, SUMMARIZE_USER_PROMPT);
        assert_eq!(requests[2].user_prompt, DecisionChoice::Ask.directive());
        assert!(requests[1].system_prompt.contains(SUMMARY));
        assert!(requests[2].system_prompt.contains("Your current mood is Curious."));
        assert!(requests.iter().all(|r| r.max_tokens == 64));

        let payloads = tokio::fs::read_to_string(layout.payload_log_path()).await.unwrap();
        assert_eq!(payloads.matches("\"max_tokens\": 64").count(), 3);
    }

    #[tokio::test]
    async fn silence_still_calls_backend_but_records_silence() {
        let mock = Arc::new(phase_aware("Silence", "I would rather say something."));
        let (_tmp, _layout, engine) = setup(mock.clone());

        let output = engine.execute("bob").await.unwrap();
        assert_eq!(output.choice, Some(DecisionChoice::Silence));
        assert_eq!(output.response, "### BOB\n\n[silence]\n\n---");
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn backend_failure_flows_through_as_text() {
        let mock = Arc::new(MockProvider::new("mock"));
        mock.push_failure("connection refused");
        mock.push_failure("connection refused");
        mock.push_failure("connection refused");
        let (_tmp, layout, engine) = setup(mock);

        let output = engine.execute("ada").await.unwrap();
        assert!(output.summary.starts_with(BACKEND_ERROR_PREFIX));
        assert!(output.decision.starts_with(BACKEND_ERROR_PREFIX));
        // Unparsable decision falls back to the Respond directive.
        assert_eq!(output.choice, Some(DecisionChoice::Respond));
        assert!(output.response.starts_with("### ADA\n\n[Error from llama-server:"));

        let artifacts = ArtifactStore::new(layout);
        assert_eq!(artifacts.records("ada", Phase::Hcall).await.unwrap().len(), 1);
        assert_eq!(artifacts.records("ada", Phase::Dcall).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn decide_sees_placeholder_before_any_summary() {
        let mock = Arc::new(MockProvider::new("mock").with_response(decision("Reflect")));
        let (_tmp, _layout, engine) = setup(mock.clone());

        engine.dcall("ada").await.unwrap();
        let requests = mock.requests();
        assert!(requests[0].system_prompt.contains(NO_ARTIFACT));
    }

    #[tokio::test]
    async fn config_edits_apply_to_next_phase() {
        let mock = Arc::new(phase_aware("Respond", "Noted."));
        let (_tmp, layout, engine) = setup(mock);

        write_config(&layout, "c3", "name: First\n").await;
        engine.hcall("c3").await.unwrap();
        engine.dcall("c3").await.unwrap();
        write_config(&layout, "c3", "name: Second\n").await;
        let (_, block) = engine.rcall("c3").await.unwrap();
        assert!(block.starts_with("### SECOND"));
    }

    #[tokio::test]
    async fn storage_failure_aborts_turn() {
        let mock = Arc::new(phase_aware("Ask", "Hi."));
        let (_tmp, layout, engine) = setup(mock);
        // A regular file where the agent directory should be.
        tokio::fs::create_dir_all(layout.agents_dir()).await.unwrap();
        tokio::fs::write(layout.agent_dir("ada"), "not a directory").await.unwrap();

        let err = engine.execute("ada").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RoundtableError>(),
            Some(RoundtableError::Storage(_))
        ));
        assert_eq!(engine.memory().read().await.unwrap(), "");
    }

    #[tokio::test]
    async fn runs_through_turn_runner_seam() {
        let mock = Arc::new(phase_aware("Echo", "So, rain."));
        let (_tmp, _layout, engine) = setup(mock);
        let runner: &dyn TurnRunner = &engine;
        runner.run_turn("ada").await.unwrap();
        assert!(engine.memory().read().await.unwrap().contains("So, rain."));
    }
}
