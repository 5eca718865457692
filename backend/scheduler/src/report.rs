use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A turn whose phases returned an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedTurn {
    pub turn: u32,
    pub agent: String,
    pub error: String,
}

/// Outcome of one scheduler run. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub turns_executed: u32,
    pub failures: Vec<FailedTurn>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            turns_executed: 0,
            failures: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> u32 {
        self.turns_executed - self.failures.len() as u32
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
