use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use roundtable_core::{Layout, Phase, NO_ARTIFACT};

use crate::tail::tail_blocks;
use crate::types::{unescape_body, PhaseArtifact, TIMESTAMP_FORMAT};

/// Matches a record header line such as `[2025-03-01 14:02:11]`.
static RECORD_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]$").expect("valid header regex")
});

/// Per-agent, per-phase append-only artifact logs under `agents/<id>/`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: Layout,
    writer: Arc<Mutex<()>>,
}

impl ArtifactStore {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Append a timestamped record of `text` (trimmed) to the agent's phase log.
    pub async fn append(&self, agent_id: &str, phase: Phase, text: &str) -> Result<PhaseArtifact> {
        let artifact = PhaseArtifact {
            agent_id: agent_id.to_string(),
            phase,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            text: text.trim().to_string(),
        };

        let _guard = self.writer.lock().await;
        let dir = self.layout.agent_dir(agent_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create agent directory: {}", dir.display()))?;

        let path = self.layout.phase_log_path(agent_id, phase);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {} log: {}", phase, path.display()))?;
        file.write_all(artifact.to_record().as_bytes())
            .await
            .with_context(|| format!("Failed to append {} artifact: {}", phase, path.display()))?;
        file.flush().await?;

        debug!(agent = %agent_id, phase = %phase, bytes = artifact.text.len(), "Artifact persisted");
        Ok(artifact)
    }

    /// Every record in the agent's phase log, oldest first.
    pub async fn records(&self, agent_id: &str, phase: Phase) -> Result<Vec<PhaseArtifact>> {
        let raw = self.read_log(agent_id, phase).await?;
        Ok(parse_records(&raw)
            .into_iter()
            .map(|(timestamp, text)| PhaseArtifact {
                agent_id: agent_id.to_string(),
                phase,
                timestamp,
                text,
            })
            .collect())
    }

    /// Text of the most recent record, or [`NO_ARTIFACT`] when there is none.
    pub async fn latest_of(&self, agent_id: &str, phase: Phase) -> Result<String> {
        let raw = self.read_log(agent_id, phase).await?;
        Ok(parse_records(&raw)
            .pop()
            .map(|(_, text)| text)
            .unwrap_or_else(|| NO_ARTIFACT.to_string()))
    }

    /// The last `n` blank-line-delimited blocks of the phase log.
    pub async fn tail(&self, agent_id: &str, phase: Phase, n: usize) -> Result<Vec<String>> {
        let raw = self.read_log(agent_id, phase).await?;
        Ok(tail_blocks(&raw, n))
    }

    async fn read_log(&self, agent_id: &str, phase: Phase) -> Result<String> {
        let path = self.layout.phase_log_path(agent_id, phase);
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} log: {}", phase, path.display())),
        }
    }
}

/// Split a phase log into `(timestamp, text)` records.
///
/// Records are delimited by header lines rather than blank lines, because
/// response records contain blank lines of their own.
fn parse_records(raw: &str) -> Vec<(String, String)> {
    let headers: Vec<(usize, usize, String)> = RECORD_HEADER_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps.get(1)?.as_str().to_string()))
        })
        .collect();

    headers
        .iter()
        .enumerate()
        .map(|(i, (_, body_start, timestamp))| {
            let body_end = headers.get(i + 1).map_or(raw.len(), |next| next.0);
            (timestamp.clone(), unescape_body(raw[*body_start..body_end].trim()))
        })
        .collect()
}
