//! CLI Memory Subcommands
//!
//! View, post to and clear the shared conversation transcript.

use anyhow::Result;
use clap::Subcommand;

use roundtable_memory::ConversationMemory;

use crate::api::USER_MESSAGE_PREFIX;
use crate::terminal_output::{note_info, note_success};

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Print the conversation transcript
    Show,
    /// Append an operator message to the transcript
    Post {
        /// Message text
        text: String,
    },
    /// Erase the transcript
    Clear,
}

pub async fn run(cmd: MemoryCommands, memory: &ConversationMemory) -> Result<()> {
    match cmd {
        MemoryCommands::Show => {
            let content = memory.read().await?;
            if content.is_empty() {
                note_info("Transcript is empty");
            } else {
                print!("{content}");
            }
        }
        MemoryCommands::Post { text } => {
            let text = text.trim();
            if text.is_empty() {
                note_info("Nothing to post");
            } else {
                memory.append(&format!("{USER_MESSAGE_PREFIX}{text}\n")).await?;
                note_success("Message posted");
            }
        }
        MemoryCommands::Clear => {
            memory.clear().await?;
            note_success("Transcript cleared");
        }
    }
    Ok(())
}
