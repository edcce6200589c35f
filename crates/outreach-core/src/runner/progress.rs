//! In-memory progress of a running campaign.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use outreach_types::campaign::CampaignId;
use outreach_types::config::RunnerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Paused,
    Completed,
    Error,
}

impl RunStatus {
    /// Running and paused campaigns hold their slot; finished ones do not.
    pub fn is_live(self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Paused)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Paused => write!(f, "paused"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

/// Where the runner is within a campaign's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignProgress {
    pub campaign_id: CampaignId,
    pub step_id: String,
    pub step_index: usize,
    /// Next lead to send to within the current step.
    pub lead_index: usize,
    pub status: RunStatus,
    pub error: Option<String>,
    /// Successful sends so far, across all steps.
    pub sent: usize,
    /// Failed sends so far, across all steps.
    pub failed: usize,
}

impl CampaignProgress {
    pub fn new(campaign_id: CampaignId, first_step_id: String) -> Self {
        Self {
            campaign_id,
            step_id: first_step_id,
            step_index: 0,
            lead_index: 0,
            status: RunStatus::Running,
            error: None,
            sent: 0,
            failed: 0,
        }
    }
}

/// Percentage of the whole sequence delivered, 0-100.
///
/// ```
/// use outreach_core::runner::percent_complete;
///
/// // Second of two steps, half the leads done.
/// assert_eq!(percent_complete(1, 5, 2, 10), 75);
/// ```
pub fn percent_complete(step_index: usize, lead_index: usize, steps: usize, leads: usize) -> u8 {
    let total = steps * leads;
    if total == 0 {
        return 0;
    }
    let done = (step_index * leads + lead_index.min(leads)).min(total);
    (done * 100 / total) as u8
}

/// Runner pacing.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub batch_size: usize,
    pub interval: Duration,
    pub opportunity_rate: f64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&RunnerConfig::default())
    }
}

impl From<&RunnerConfig> for RunnerSettings {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            interval: Duration::from_secs(config.interval_secs.max(1)),
            opportunity_rate: config.opportunity_rate,
        }
    }
}
