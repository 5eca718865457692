//! CLI agent inspection: the roster and each agent's recent phase logs.

use anyhow::Result;

use roundtable_config::ConfigLoader;
use roundtable_core::{Layout, Phase};
use roundtable_memory::ArtifactStore;

use crate::terminal_output::{block, heading, note_info, render_table};
use crate::view::{is_valid_agent_id, turn_view};

pub async fn list(layout: &Layout) -> Result<()> {
    let loader = ConfigLoader::new(layout.clone());
    let agents = loader.list_agents().await?;
    if agents.is_empty() {
        note_info(&format!("No agents under {}", layout.agents_dir().display()));
        return Ok(());
    }

    let mut rows = Vec::with_capacity(agents.len());
    for id in &agents {
        let agent = loader.load(id).await;
        rows.push(vec![
            agent.id.clone(),
            agent.display_name.clone(),
            agent.tone.clone(),
            agent.goals_line(),
        ]);
    }
    print!("{}", render_table(&["Agent", "Name", "Tone", "Goals"], &rows));
    Ok(())
}

/// Print the last `blocks` records of each phase log plus the payload log tail.
pub async fn logs(layout: &Layout, agent_id: &str, blocks: usize) -> Result<()> {
    if !is_valid_agent_id(agent_id) {
        anyhow::bail!("invalid agent id '{agent_id}'");
    }
    let artifacts = ArtifactStore::new(layout.clone());
    let view = turn_view(layout, &artifacts, agent_id, blocks).await;

    for (phase, entries) in [
        (Phase::Hcall, &view.logs.hcall),
        (Phase::Dcall, &view.logs.dcall),
        (Phase::Rcall, &view.logs.rcall),
    ] {
        heading(phase.log_file_name());
        if entries.is_empty() {
            note_info("(empty)");
        }
        for entry in entries {
            block(entry);
        }
    }

    heading("llama_payload.log");
    block(&view.payloads.tail);
    Ok(())
}
