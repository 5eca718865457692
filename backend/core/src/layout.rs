//! On-disk layout of a conversation workspace.
//!
//! ```text
//! <root>/
//!   convo.md                 shared transcript
//!   llama_payload.log        every backend request
//!   agents/<id>/config.yaml  persona definition
//!   agents/<id>/*.db         per-phase artifact logs
//! ```

use std::path::{Path, PathBuf};

use crate::types::Phase;

const AGENTS_DIR: &str = "agents";
const CONFIG_FILE_NAME: &str = "config.yaml";
const CONVERSATION_FILE_NAME: &str = "convo.md";
const PAYLOAD_LOG_FILE_NAME: &str = "llama_payload.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join(AGENTS_DIR)
    }

    pub fn agent_dir(&self, agent_id: &str) -> PathBuf {
        self.agents_dir().join(agent_id)
    }

    pub fn config_path(&self, agent_id: &str) -> PathBuf {
        self.agent_dir(agent_id).join(CONFIG_FILE_NAME)
    }

    pub fn phase_log_path(&self, agent_id: &str, phase: Phase) -> PathBuf {
        self.agent_dir(agent_id).join(phase.log_file_name())
    }

    pub fn conversation_path(&self) -> PathBuf {
        self.root.join(CONVERSATION_FILE_NAME)
    }

    pub fn payload_log_path(&self) -> PathBuf {
        self.root.join(PAYLOAD_LOG_FILE_NAME)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(".")
    }
}
