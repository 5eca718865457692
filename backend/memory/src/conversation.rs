use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The single transcript shared by every agent.
///
/// Clones share one writer lock, so all writes made through handles cloned
/// from the same `ConversationMemory` are serialized. Writers in other
/// processes are not coordinated.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    path: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl ConversationMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full transcript text; empty when nothing has been written yet.
    pub async fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read transcript: {}", self.path.display())),
        }
    }

    /// Append `block` followed by a newline, creating the transcript if absent.
    pub async fn append(&self, block: &str) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.ensure_parent().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open transcript: {}", self.path.display()))?;
        file.write_all(format!("{block}\n").as_bytes())
            .await
            .with_context(|| format!("Failed to append to transcript: {}", self.path.display()))?;
        file.flush().await?;

        debug!(bytes = block.len() + 1, "Appended transcript block");
        Ok(())
    }

    /// Truncate the transcript to empty.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.ensure_parent().await?;
        fs::write(&self.path, b"")
            .await
            .with_context(|| format!("Failed to clear transcript: {}", self.path.display()))?;
        info!(path = %self.path.display(), "Transcript cleared");
        Ok(())
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create transcript directory: {}", parent.display())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_of_missing_transcript_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new(tmp.path().join("convo.md"));
        assert_eq!(memory.read().await.unwrap(), "");
    }

    #[tokio::test]
    async fn clear_then_append_reads_back_exactly() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new(tmp.path().join("convo.md"));
        memory.append("old news").await.unwrap();
        memory.clear().await.unwrap();
        memory.append("X").await.unwrap();
        assert_eq!(memory.read().await.unwrap(), "X\n");
    }

    #[tokio::test]
    async fn appends_accumulate_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new(tmp.path().join("nested/convo.md"));
        memory.append("first").await.unwrap();
        memory.append("second").await.unwrap();
        assert_eq!(memory.read().await.unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn concurrent_clones_do_not_interleave() {
        let tmp = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::new(tmp.path().join("convo.md"));
        let mut handles = Vec::new();
        for i in 0..16 {
            let memory = memory.clone();
            handles.push(tokio::spawn(async move {
                memory.append(&format!("block-{i}")).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let text = memory.read().await.unwrap();
        assert_eq!(text.lines().count(), 16);
        assert!(text.lines().all(|l| l.starts_with("block-")));
    }
}
