use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Text forced into the transcript when an agent chooses not to speak.
pub const SILENCE: &str = "[silence]";

/// Returned by artifact lookups when an agent has no record for a phase yet.
pub const NO_ARTIFACT: &str = "[no summary available]";

/// A persona taking part in the conversation, as resolved from its config document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentDefinition {
    pub id: String,
    pub display_name: String,
    pub persona: String,
    pub tone: String,
    pub style: String,
    pub goals: Vec<String>,
}

impl AgentDefinition {
    pub const DEFAULT_TONE: &'static str = "neutral";
    pub const DEFAULT_STYLE: &'static str = "default";

    /// The definition used when an agent has no usable config document.
    pub fn with_defaults(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            persona: String::new(),
            tone: Self::DEFAULT_TONE.to_string(),
            style: Self::DEFAULT_STYLE.to_string(),
            goals: Vec::new(),
        }
    }

    /// Persona text, or the display name when none is configured.
    pub fn persona_or_name(&self) -> &str {
        if self.persona.is_empty() {
            &self.display_name
        } else {
            &self.persona
        }
    }

    pub fn goals_line(&self) -> String {
        self.goals.join(", ")
    }
}

/// The three phases of a turn, each with its own append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Summarize the conversation so far.
    Hcall,
    /// Privately decide mood and next move.
    Dcall,
    /// Speak into the shared transcript.
    Rcall,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Hcall, Phase::Dcall, Phase::Rcall];

    /// File name of this phase's log inside the agent directory.
    pub fn log_file_name(&self) -> &'static str {
        match self {
            Phase::Hcall => "hcall_history.db",
            Phase::Dcall => "dcall_dialog.db",
            Phase::Rcall => "rcall_response.db",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Hcall => "hcall",
            Phase::Dcall => "dcall",
            Phase::Rcall => "rcall",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moods an agent may report during the decide phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Curious,
    Afraid,
    Surprised,
    Disgusted,
    Bored,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Curious,
        Mood::Afraid,
        Mood::Surprised,
        Mood::Disgusted,
        Mood::Bored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Angry => "Angry",
            Mood::Curious => "Curious",
            Mood::Afraid => "Afraid",
            Mood::Surprised => "Surprised",
            Mood::Disgusted => "Disgusted",
            Mood::Bored => "Bored",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown mood '{s}'"))
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an agent chose to contribute on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionChoice {
    Ask,
    Respond,
    Reflect,
    Evaluate,
    Echo,
    Branch,
    Store,
    Defer,
    Amplify,
    Silence,
}

impl DecisionChoice {
    pub const ALL: [DecisionChoice; 10] = [
        DecisionChoice::Ask,
        DecisionChoice::Respond,
        DecisionChoice::Reflect,
        DecisionChoice::Evaluate,
        DecisionChoice::Echo,
        DecisionChoice::Branch,
        DecisionChoice::Store,
        DecisionChoice::Defer,
        DecisionChoice::Amplify,
        DecisionChoice::Silence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionChoice::Ask => "Ask",
            DecisionChoice::Respond => "Respond",
            DecisionChoice::Reflect => "Reflect",
            DecisionChoice::Evaluate => "Evaluate",
            DecisionChoice::Echo => "Echo",
            DecisionChoice::Branch => "Branch",
            DecisionChoice::Store => "Store",
            DecisionChoice::Defer => "Defer",
            DecisionChoice::Amplify => "Amplify",
            DecisionChoice::Silence => "Silence",
        }
    }

    /// The user prompt sent in the respond phase for this choice.
    pub fn directive(&self) -> &'static str {
        match self {
            DecisionChoice::Ask => {
                "Ask a relevant question that advances the conversation or deepens understanding."
            }
            DecisionChoice::Respond => "Respond directly to the last message with clarity and intent.",
            DecisionChoice::Reflect => {
                "Offer a thoughtful reflection on the conversation or its implications."
            }
            DecisionChoice::Evaluate => {
                "Evaluate the previous message or idea. Provide a judgment and justification."
            }
            DecisionChoice::Echo => {
                "Rephrase or summarize the last message to reinforce or clarify its meaning."
            }
            DecisionChoice::Branch => {
                "Begin a new thought or introduce a related topic that expands the conversation."
            }
            DecisionChoice::Store => "Note what should be remembered and explain why it's important.",
            DecisionChoice::Defer => "Defer to another agent. Indicate who should continue and why.",
            DecisionChoice::Amplify => {
                "Strengthen or elaborate on the last message. Add insight or depth."
            }
            DecisionChoice::Silence => "(Chose not to speak. Return '[silence]' or nothing.)",
        }
    }
}

impl FromStr for DecisionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecisionChoice::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown decision choice '{s}'"))
    }
}

impl fmt::Display for DecisionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
