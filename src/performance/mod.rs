pub mod export;
pub mod metrics;
pub mod monitor;
pub mod patterns;
pub mod runner;

pub use export::{run_prefix, HistoryWriter, ResultFiles};
pub use metrics::{FailureRow, HistoryRow, StatsRegistry, StatsRow};
pub use patterns::SpawnSchedule;
pub use runner::{LoadTestRunner, RunOutcome};
