//! Tail views over append-only logs, for inspection surfaces.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

/// The last `n` blank-line-delimited blocks of `text`, oldest first.
pub fn tail_blocks(text: &str, n: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || n == 0 {
        return Vec::new();
    }
    let blocks: Vec<&str> = trimmed.split("\n\n").collect();
    let start = blocks.len().saturating_sub(n);
    blocks[start..].iter().map(|b| (*b).to_string()).collect()
}

/// The last `n` lines of the file at `path`; empty when the file is absent.
pub async fn tail_lines(path: &Path, n: usize) -> Result<String> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}
