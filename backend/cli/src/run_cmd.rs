//! `roundtable run`: drive a conversation in the foreground.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use roundtable_agent::TurnEngine;
use roundtable_core::{ChatRequest, GrammarKind, LlmProvider};
use roundtable_llm::{LlamaServerProvider, MockProvider, PayloadLog};
use roundtable_scheduler::{parse_agent_list, Scheduler};

use crate::config::Config;
use crate::terminal_output::{note_info, note_success, note_warn};

/// Offline provider answering every phase in its expected shape.
pub fn dry_run_provider() -> MockProvider {
    MockProvider::new("dry-run").with_responder(|req: &ChatRequest| {
        Ok(match req.grammar.as_ref().map(|g| g.kind()) {
            Some(GrammarKind::Summary) => {
                "Overall Summary: A dry run with no model behind it.".to_string()
            }
            Some(GrammarKind::Decision) => "mood: Curious\n\
                 reflection: I am only rehearsing my part.\n\
                 choice: Respond\n\
                 justification: A rehearsal still needs a line."
                .to_string(),
            None => "(dry run) This is where my reply would go.".to_string(),
        })
    })
}

pub async fn run(
    config: &Config,
    agents: &str,
    turns: u32,
    max_tokens: u32,
    dry_run: bool,
) -> Result<()> {
    let agents = parse_agent_list(agents);
    let layout = config.layout();

    let provider: Arc<dyn LlmProvider> = if dry_run {
        note_warn("Dry run: no requests will reach llama-server");
        Arc::new(dry_run_provider())
    } else {
        Arc::new(LlamaServerProvider::new(&config.llama_url))
    };
    info!(provider = %provider.name(), home = %layout.root().display(), "Starting conversation");

    let backend = config.backend(provider, PayloadLog::new(layout.payload_log_path()));
    let engine = TurnEngine::for_layout(&layout, backend).with_max_tokens(max_tokens);
    let scheduler = Scheduler::new(engine).with_turn_delay(config.turn_delay());

    note_info(&format!("Running {turns} turns for: {}", agents.join(", ")));
    let report = scheduler.run(&agents, turns).await?;

    for failure in &report.failures {
        note_warn(&format!(
            "Turn {} ({}) failed: {}",
            failure.turn, failure.agent, failure.error
        ));
    }
    note_success(&format!(
        "{} of {} turns completed",
        report.succeeded(),
        report.turns_executed
    ));
    Ok(())
}
