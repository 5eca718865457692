pub mod error;
pub mod grammar;
pub mod layout;
pub mod traits;
pub mod types;

pub use error::RoundtableError;
pub use grammar::{GrammarKind, GrammarViolation, OutputGrammar};
pub use layout::Layout;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, TurnRunner};
pub use types::{AgentDefinition, DecisionChoice, Mood, Phase, NO_ARTIFACT, SILENCE};
