//! Resolves a parsed config into an [`AgentDefinition`], applying defaults.

use roundtable_core::AgentDefinition;

use crate::schema::AgentConfig;

/// Merge `config` over the defaults for `agent_id`.
///
/// Blank strings count as unset; goals are trimmed and blank goals dropped.
pub fn resolve_definition(agent_id: &str, config: AgentConfig) -> AgentDefinition {
    let mut agent = AgentDefinition::with_defaults(agent_id);

    if let Some(name) = non_blank(config.name) {
        agent.display_name = name;
    }
    if let Some(persona) = non_blank(config.persona) {
        agent.persona = persona;
    }
    if let Some(tone) = non_blank(config.tone) {
        agent.tone = tone;
    }
    if let Some(style) = non_blank(config.style) {
        agent.style = style;
    }
    agent.goals = config
        .goals
        .into_iter()
        .filter_map(|g| non_blank(Some(g)))
        .collect();

    agent
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
