//! Prompt builders for the three turn phases.
//!
//! Every prompt is rebuilt from scratch on each call; the only state an agent
//! carries between turns is what it finds on disk.

use roundtable_core::{AgentDefinition, DecisionChoice, Mood};

const PERSONA_PREAMBLE: &str = "You are not an assistant, you are a named persona who \
instantiates from the system prompt and persists across API calls.";

pub const SUMMARIZE_USER_PROMPT: &str = "Please summarize the current conversational context.";

fn traits_block(agent: &AgentDefinition, persona: &str, with_goals: bool) -> String {
    let mut block = format!(
        "You are {}, with the following traits:\nPersona: {}\nTone: {}\nStyle: {}",
        agent.display_name, persona, agent.tone, agent.style
    );
    if with_goals {
        block.push_str("\nGoals: ");
        block.push_str(&agent.goals_line());
    }
    block
}

/// System prompt for the summarize phase.
pub fn summarize_system_prompt(agent: &AgentDefinition, conversation: &str) -> String {
    format!(
        "{PERSONA_PREAMBLE}\n\n{}\n\
         Your goal is to summarize what is happening in this conversation so far, \
         in your own voice and perspective.\n\n\
         Here is the current conversational context: {conversation}\n",
        traits_block(agent, agent.persona_or_name(), false)
    )
}

/// System prompt for the private decide phase.
pub fn decide_system_prompt(agent: &AgentDefinition, summary: &str, conversation: &str) -> String {
    format!(
        "{PERSONA_PREAMBLE}\n\n{}\n\n\
         Whats going on, according to you: {summary}\n\n\
         Here is the full current conversation:\n{conversation}\n\n\
         Now, reflect internally. Decide how to proceed, what your mood is, and why.\n\
         Do not produce conversation output yet. This is a private decision.\n",
        traits_block(agent, &agent.persona, true)
    )
}

/// User prompt for the decide phase: the choice menu plus the answer format.
pub fn decide_user_prompt() -> String {
    let moods = Mood::ALL.map(|m| m.as_str()).join(", ");
    let choices = DecisionChoice::ALL
        .iter()
        .map(|c| format!("    \"{}\": \"{}\"", c.as_str(), c.directive()))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "Based on your perception of what is going on, choose what best describes your mood, \
         reflect upon your mood state with one sentence, your choice of response, \
         and a one sentence justification.\n\n\
         Your moods are: {moods}\n\n\
         Your choices are:\n\n{choices}\n\n\
         Answer in exactly this format:\n\
         mood: <mood>\n\
         reflection: <one sentence>\n\
         choice: <choice>\n\
         justification: <one sentence>"
    )
}

/// System prompt for the respond phase.
pub fn respond_system_prompt(
    agent: &AgentDefinition,
    summary: &str,
    conversation: &str,
    mood: &str,
) -> String {
    format!(
        "{PERSONA_PREAMBLE}\n\n{}\n\n\
         Whats going on, according to you: {summary}\n\n\
         Here is the full current conversation:\n{conversation}\n\n\
         You are continuing the conversation based on a choice you have made for the user prompt. \
         Do not include your name, the system does that for you.\n\n\
         Your current mood is {mood}.\n",
        traits_block(agent, &agent.persona, true)
    )
}

/// Frame a response body as a transcript block under the speaker's heading.
pub fn format_response(display_name: &str, body: &str) -> String {
    format!("### {}\n\n{}\n\n---", display_name.to_uppercase(), body.trim())
}
