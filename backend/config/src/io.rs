//! Config document reads and agent directory enumeration.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

use crate::schema::AgentConfig;

/// Read and parse one agent config.
///
/// Returns `Ok(None)` when the document does not exist. An empty document
/// parses to the default config.
pub async fn read_agent_config(path: &Path) -> Result<Option<AgentConfig>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Agent config does not exist");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read agent config: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(Some(AgentConfig::default()));
    }

    let config: AgentConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse agent config YAML at: {}", path.display()))?;
    Ok(Some(config))
}

/// List agent identifiers: the names of the subdirectories of `agents_dir`, sorted.
pub async fn list_agents(agents_dir: &Path) -> Result<Vec<String>> {
    if !fs::try_exists(agents_dir).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let mut entries = fs::read_dir(agents_dir)
        .await
        .with_context(|| format!("Failed to list agents in: {}", agents_dir.display()))?;

    let mut agents = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            agents.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    agents.sort();
    Ok(agents)
}
