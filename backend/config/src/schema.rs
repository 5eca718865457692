//! Schema of an agent's `config.yaml`.
//!
//! Every field is optional; unknown keys are ignored so persona documents can
//! carry notes for humans.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name; falls back to the agent identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Ordered goals, rendered comma-separated into prompts
    #[serde(default)]
    pub goals: Vec<String>,
}
