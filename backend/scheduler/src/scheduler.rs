use std::time::Duration;

use tracing::{info, instrument, warn};

use logging::{EventLogger, TurnEvent};
use roundtable_core::{RoundtableError, TurnRunner};

use crate::cycle::TurnCycle;
use crate::report::{FailedTurn, RunReport};

/// Pause between consecutive turns.
pub const DEFAULT_TURN_DELAY: Duration = Duration::from_millis(200);

/// Drives turns round-robin over a fixed agent roster, one at a time.
///
/// A failing turn is logged and recorded in the [`RunReport`]; the run moves
/// on to the next turn.
pub struct Scheduler<R> {
    runner: R,
    turn_delay: Duration,
}

impl<R: TurnRunner> Scheduler<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            turn_delay: DEFAULT_TURN_DELAY,
        }
    }

    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute exactly `turns` turns over `agents`.
    ///
    /// Fails with [`RoundtableError::InvalidSchedule`] before any turn runs
    /// when the roster is empty or `turns` is zero.
    #[instrument(skip(self, agents), fields(agents = agents.len()))]
    pub async fn run(&self, agents: &[String], turns: u32) -> Result<RunReport, RoundtableError> {
        if agents.is_empty() {
            return Err(RoundtableError::invalid_schedule("agent list is empty"));
        }
        if turns < 1 {
            return Err(RoundtableError::invalid_schedule("turns must be at least 1"));
        }

        let mut report = RunReport::new();
        info!(run_id = %report.run_id, ?agents, turns, "Starting run");

        for (turn, agent) in TurnCycle::new(agents, turns) {
            EventLogger::log_event(TurnEvent::TurnStarted {
                turn,
                agent: agent.to_string(),
            });

            if let Err(e) = self.runner.run_turn(agent).await {
                warn!(turn, agent, error = %e, "Turn failed; continuing with next turn");
                EventLogger::log_event(TurnEvent::TurnFailed {
                    turn,
                    agent: agent.to_string(),
                    error: format!("{e:#}"),
                });
                report.failures.push(FailedTurn {
                    turn,
                    agent: agent.to_string(),
                    error: format!("{e:#}"),
                });
            }
            report.turns_executed += 1;

            if turn < turns && !self.turn_delay.is_zero() {
                tokio::time::sleep(self.turn_delay).await;
            }
        }

        report.finished_at = Some(chrono::Utc::now());
        EventLogger::log_event(TurnEvent::RunFinished {
            turns: report.turns_executed,
            failures: report.failures.len(),
        });
        info!(
            run_id = %report.run_id,
            executed = report.turns_executed,
            failed = report.failures.len(),
            "Run finished"
        );
        Ok(report)
    }
}
