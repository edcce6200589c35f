//! Campaign batch runner.

pub mod engine;
pub mod progress;

pub use engine::{CampaignRunner, TickOutcome};
pub use progress::{CampaignProgress, RunStatus, RunnerSettings, percent_complete};
