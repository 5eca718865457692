//! Durable conversation state: the shared transcript and per-agent artifact logs.
//!
//! Both stores are plain append-only text files so they can be inspected with
//! standard tools while a conversation runs.

pub mod artifacts;
pub mod conversation;
pub mod tail;
pub mod types;

pub use artifacts::ArtifactStore;
pub use conversation::ConversationMemory;
pub use tail::{tail_blocks, tail_lines};
pub use types::PhaseArtifact;
