//! In-process job submission for conversation runs.
//!
//! At most one run is active at a time; a second submission while one is
//! running is refused.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use roundtable_agent::{TurnEngine, DEFAULT_MAX_TOKENS};
use roundtable_config::ConfigLoader;
use roundtable_core::Layout;
use roundtable_llm::{ModelBackend, PayloadLog};
use roundtable_memory::{ArtifactStore, ConversationMemory};
use roundtable_scheduler::{parse_agent_list, RunReport, Scheduler};

fn default_max_tokens() -> i64 {
    i64::from(DEFAULT_MAX_TOKENS)
}

/// Accepts a JSON integer, a float (truncated) or a numeric string.
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom(format!("invalid integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid integer: {s:?}"))),
        other => Err(de::Error::custom(format!("invalid integer: {other}"))),
    }
}

/// Parameters of a submitted run.
///
/// Counts are signed; [`JobRegistry::submit`] refuses anything below 1.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub turns: i64,
    #[serde(default = "default_max_tokens", deserialize_with = "lenient_int")]
    pub max_tokens: i64,
}

impl RunRequest {
    /// Agent ids trimmed, blanks dropped.
    fn roster(&self) -> Vec<String> {
        parse_agent_list(&self.agents.join(","))
    }
}

/// Returned to the submitter; identifies the job for status polling.
#[derive(Debug, Clone, Serialize)]
pub struct JobHandle {
    pub id: Uuid,
    pub agents: Vec<String>,
    pub turns: u32,
    pub max_tokens: u32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Finished { report: RunReport },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job: JobHandle,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(String),
    #[error("a run is already active (job {0})")]
    Busy(Uuid),
}

#[derive(Default)]
struct JobTable {
    active: Option<Uuid>,
    jobs: HashMap<Uuid, JobRecord>,
}

/// Launches runs as tokio tasks sharing the process's transcript and artifact handles.
#[derive(Clone)]
pub struct JobRegistry {
    layout: Layout,
    memory: ConversationMemory,
    artifacts: ArtifactStore,
    payload_log: PayloadLog,
    backend: Arc<dyn Fn(PayloadLog) -> ModelBackend + Send + Sync>,
    turn_delay: Duration,
    table: Arc<Mutex<JobTable>>,
}

impl JobRegistry {
    pub fn new(
        layout: Layout,
        memory: ConversationMemory,
        artifacts: ArtifactStore,
        backend: impl Fn(PayloadLog) -> ModelBackend + Send + Sync + 'static,
    ) -> Self {
        Self {
            payload_log: PayloadLog::new(layout.payload_log_path()),
            layout,
            memory,
            artifacts,
            backend: Arc::new(backend),
            turn_delay: roundtable_scheduler::DEFAULT_TURN_DELAY,
            table: Arc::new(Mutex::new(JobTable::default())),
        }
    }

    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    /// Validate and launch a run in the background.
    pub async fn submit(&self, request: RunRequest) -> Result<JobHandle, SubmitError> {
        let agents = request.roster();
        let turns = match u32::try_from(request.turns) {
            Ok(turns) if turns >= 1 && !agents.is_empty() => turns,
            _ => return Err(SubmitError::Invalid("No agents or invalid turn count".to_string())),
        };
        let max_tokens = match u32::try_from(request.max_tokens) {
            Ok(max_tokens) if max_tokens >= 1 => max_tokens,
            _ => return Err(SubmitError::Invalid("max_tokens must be at least 1".to_string())),
        };

        let handle = JobHandle {
            id: Uuid::new_v4(),
            agents,
            turns,
            max_tokens,
            submitted_at: Utc::now(),
        };

        {
            let mut table = self.table.lock().await;
            if let Some(active) = table.active {
                return Err(SubmitError::Busy(active));
            }
            table.active = Some(handle.id);
            table.jobs.insert(
                handle.id,
                JobRecord {
                    job: handle.clone(),
                    status: JobStatus::Running,
                },
            );
        }

        info!(job_id = %handle.id, agents = ?handle.agents, turns = handle.turns, "Run submitted");

        let engine = TurnEngine::new(
            ConfigLoader::new(self.layout.clone()),
            self.memory.clone(),
            self.artifacts.clone(),
            (self.backend)(self.payload_log.clone()),
        )
        .with_max_tokens(handle.max_tokens);
        let scheduler = Scheduler::new(engine).with_turn_delay(self.turn_delay);
        let table = Arc::clone(&self.table);
        let job = handle.clone();

        tokio::spawn(async move {
            let agents = job.agents.clone();
            let turns = job.turns;
            let run = tokio::spawn(async move { scheduler.run(&agents, turns).await });
            let status = match run.await {
                Ok(Ok(report)) => JobStatus::Finished { report },
                Ok(Err(e)) => {
                    error!(job_id = %job.id, error = %e, "Run could not start");
                    JobStatus::Failed { error: e.to_string() }
                }
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Run task aborted");
                    JobStatus::Failed {
                        error: format!("run task aborted: {e}"),
                    }
                }
            };
            let mut table = table.lock().await;
            if let Some(record) = table.jobs.get_mut(&job.id) {
                record.status = status;
            }
            table.active = None;
        });

        Ok(handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.table.lock().await.jobs.get(&id).cloned()
    }

    pub async fn active(&self) -> Option<Uuid> {
        self.table.lock().await.active
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use roundtable_core::LlmProvider;
    use roundtable_llm::MockProvider;

    use super::*;

    /// Registry whose runs talk to `provider` with default sampling settings.
    pub(crate) fn mock_registry(
        layout: &Layout,
        memory: ConversationMemory,
        reply: &str,
        delay: Duration,
    ) -> JobRegistry {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("mock").with_response(reply));
        JobRegistry::new(
            layout.clone(),
            memory,
            ArtifactStore::new(layout.clone()),
            move |log| ModelBackend::new(provider.clone(), log),
        )
        .with_turn_delay(delay)
    }

    fn registry(dir: &std::path::Path, delay: Duration) -> JobRegistry {
        let layout = Layout::new(dir);
        mock_registry(&layout, ConversationMemory::new(layout.conversation_path()), "Hello.", delay)
    }

    fn request(agents: &[&str], turns: i64) -> RunRequest {
        RunRequest {
            agents: agents.iter().map(|s| s.to_string()).collect(),
            turns,
            max_tokens: 32,
        }
    }

    async fn wait_for_finish(registry: &JobRegistry, id: Uuid) -> JobRecord {
        for _ in 0..200 {
            let record = registry.get(id).await.unwrap();
            if !matches!(record.status, JobStatus::Running) {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    #[tokio::test]
    async fn rejects_empty_roster_and_zero_turns() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = registry(tmp.path(), Duration::ZERO);

        assert!(matches!(
            registry.submit(request(&[" ", ""], 2)).await,
            Err(SubmitError::Invalid(_))
        ));
        assert!(matches!(
            registry.submit(request(&["a"], 0)).await,
            Err(SubmitError::Invalid(_))
        ));
        assert!(registry.active().await.is_none());
    }

    #[tokio::test]
    async fn runs_to_completion_and_frees_the_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = registry(tmp.path(), Duration::ZERO);

        let handle = registry.submit(request(&[" a", "b "], 3)).await.unwrap();
        assert_eq!(handle.agents, vec!["a", "b"]);

        let record = wait_for_finish(&registry, handle.id).await;
        match record.status {
            JobStatus::Finished { report } => assert_eq!(report.turns_executed, 3),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(registry.active().await.is_none());

        let transcript = tokio::fs::read_to_string(tmp.path().join("convo.md")).await.unwrap();
        assert_eq!(transcript.matches("\n---\n").count(), 3);
    }

    #[tokio::test]
    async fn panicking_run_is_marked_failed_and_frees_the_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let provider: Arc<dyn LlmProvider> =
            Arc::new(MockProvider::new("mock").with_responder(|_| panic!("provider blew up")));
        let registry = JobRegistry::new(
            layout.clone(),
            ConversationMemory::new(layout.conversation_path()),
            ArtifactStore::new(layout.clone()),
            move |log| ModelBackend::new(provider.clone(), log),
        )
        .with_turn_delay(Duration::ZERO);

        let handle = registry.submit(request(&["a"], 1)).await.unwrap();
        let record = wait_for_finish(&registry, handle.id).await;
        match record.status {
            JobStatus::Failed { error } => assert!(error.contains("aborted"), "{error}"),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(registry.active().await.is_none());
        assert!(registry.submit(request(&["a"], 1)).await.is_ok());
    }

    #[tokio::test]
    async fn refuses_second_run_while_one_is_active() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = registry(tmp.path(), Duration::from_secs(5));

        let first = registry.submit(request(&["a"], 2)).await.unwrap();
        match registry.submit(request(&["b"], 1)).await {
            Err(SubmitError::Busy(active)) => assert_eq!(active, first.id),
            other => panic!("expected busy, got {other:?}"),
        }
    }
}
