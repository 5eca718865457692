//! Read-only views over an agent's phase logs and the backend payload log.

use serde::Serialize;

use roundtable_core::{Layout, Phase};
use roundtable_memory::{tail_lines, ArtifactStore};

pub const DEFAULT_BLOCKS: usize = 5;
pub const PAYLOAD_TAIL_LINES: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct PhaseLogs {
    pub hcall: Vec<String>,
    pub dcall: Vec<String>,
    pub rcall: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadTail {
    pub tail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub logs: PhaseLogs,
    pub payloads: PayloadTail,
}

/// Agent ids name directories under `agents/`; anything that could escape it is refused.
pub fn is_valid_agent_id(agent_id: &str) -> bool {
    !agent_id.is_empty()
        && agent_id != "."
        && agent_id != ".."
        && !agent_id.contains(['/', '\\'])
}

/// Last `blocks` blocks of each phase log plus the payload log tail.
///
/// Read failures are reported inline rather than failing the whole view.
pub async fn turn_view(
    layout: &Layout,
    artifacts: &ArtifactStore,
    agent_id: &str,
    blocks: usize,
) -> TurnView {
    let tail = |phase: Phase| async move {
        artifacts
            .tail(agent_id, phase, blocks)
            .await
            .unwrap_or_else(|e| vec![format!("[Error reading {}: {e}]", phase.log_file_name())])
    };

    let payload_path = layout.payload_log_path();
    let payload_tail = tail_lines(&payload_path, PAYLOAD_TAIL_LINES)
        .await
        .unwrap_or_else(|e| format!("[Error reading llama_payload.log: {e}]"));

    TurnView {
        logs: PhaseLogs {
            hcall: tail(Phase::Hcall).await,
            dcall: tail(Phase::Dcall).await,
            rcall: tail(Phase::Rcall).await,
        },
        payloads: PayloadTail { tail: payload_tail },
    }
}
