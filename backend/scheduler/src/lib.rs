pub mod cycle;
pub mod report;
pub mod scheduler;

pub use cycle::{parse_agent_list, TurnCycle};
pub use report::{FailedTurn, RunReport};
pub use scheduler::{Scheduler, DEFAULT_TURN_DELAY};
