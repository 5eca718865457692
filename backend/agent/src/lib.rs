//! Roundtable Turn Engine
//!
//! Runs one agent's turn as three model calls: summarize the transcript,
//! privately decide how to respond, then speak into the shared transcript.

pub mod decision;
pub mod engine;
pub mod prompts;

pub use decision::{Directive, ParsedDecision, parse_decision, resolve_directive};
pub use engine::{DEFAULT_MAX_TOKENS, TurnEngine, TurnOutput, TurnState, engine_for};
pub use prompts::format_response;
