//! `roundtable-config` — agent persona configuration.
//!
//! Provides:
//! - Typed schema for `agents/<id>/config.yaml`
//! - YAML loading that soft-fails to defaults
//! - Load-time validation (trimmed fields, blank goals dropped)
//! - Agent directory enumeration

pub mod defaults;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::resolve_definition;
pub use io::{list_agents, read_agent_config};
pub use schema::AgentConfig;
pub use validation::{validate, ValidationReport};

use roundtable_core::{AgentDefinition, Layout, RoundtableError};
use tracing::warn;

/// Resolves [`AgentDefinition`]s from the workspace's config documents.
///
/// Nothing is cached: every call re-reads the document so edits take effect
/// on the next phase of a running conversation.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    layout: Layout,
}

impl ConfigLoader {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Load one agent. Never fails: unreadable or malformed documents log a
    /// warning and yield the default definition.
    pub async fn load(&self, agent_id: &str) -> AgentDefinition {
        let config = match self.try_load(agent_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!(agent = %agent_id, error = %e, "Could not parse agent config; using defaults");
                AgentConfig::default()
            }
        };

        let report = validate(&config);
        for warning in &report.warnings {
            warn!(agent = %agent_id, field = %warning.path, message = %warning.message, "Agent config warning");
        }

        resolve_definition(agent_id, config)
    }

    /// Read the raw config document. A missing document is the default config.
    pub async fn try_load(&self, agent_id: &str) -> Result<AgentConfig, RoundtableError> {
        match read_agent_config(&self.layout.config_path(agent_id)).await {
            Ok(config) => Ok(config.unwrap_or_default()),
            Err(e) => Err(RoundtableError::Config {
                agent: agent_id.to_string(),
                message: format!("{e:#}"),
            }),
        }
    }

    pub async fn list_agents(&self) -> anyhow::Result<Vec<String>> {
        list_agents(&self.layout.agents_dir()).await
    }
}
