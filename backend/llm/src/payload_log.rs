use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only, human-readable log of every request sent to the backend.
#[derive(Debug, Clone)]
pub struct PayloadLog {
    path: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl PayloadLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry: a UTC timestamp line, the pretty-printed payload, a blank line.
    pub async fn record(&self, payload: &serde_json::Value) -> Result<()> {
        let entry = format!(
            "[{}]\n{}\n\n",
            Utc::now().to_rfc3339(),
            serde_json::to_string_pretty(payload)?
        );

        let _guard = self.writer.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open payload log: {}", self.path.display()))?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
