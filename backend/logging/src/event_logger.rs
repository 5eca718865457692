//! Turn Event Logger
//!
//! Structured turn lifecycle events, emitted through `tracing` under the
//! `turn_events` target so they land in the NDJSON log.

use chrono::{DateTime, Utc};
use roundtable_core::Phase;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    TurnStarted {
        turn: u32,
        agent: String,
    },
    PhaseCompleted {
        agent: String,
        phase: Phase,
        chars: usize,
    },
    GrammarViolation {
        agent: String,
        phase: Phase,
        reason: String,
    },
    TurnFailed {
        turn: u32,
        agent: String,
        error: String,
    },
    RunFinished {
        turns: u32,
        failures: usize,
    },
}

impl TurnEvent {
    fn is_problem(&self) -> bool {
        matches!(self, TurnEvent::GrammarViolation { .. } | TurnEvent::TurnFailed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: TurnEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Log a turn event; failures and grammar violations are logged at warn level.
    pub fn log_event(event: TurnEvent) {
        let problem = event.is_problem();
        let entry = EventLogEntry {
            timestamp: Utc::now(),
            event,
        };

        if problem {
            warn!(target: "turn_events", event = ?entry, "Turn event");
        } else {
            info!(target: "turn_events", event = ?entry, "Turn event");
        }
    }
}
