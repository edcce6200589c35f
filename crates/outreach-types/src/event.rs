//! Events emitted by the campaign runner.
//!
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;

/// Campaign runner lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunnerEvent {
    Started {
        campaign_id: CampaignId,
        lead_count: usize,
        step_count: usize,
    },

    /// One tick finished sending a batch.
    BatchSent {
        campaign_id: CampaignId,
        step_index: usize,
        sent: usize,
        failed: usize,
        progress: u8,
    },

    /// All leads received the current step; moving to the next one.
    StepAdvanced {
        campaign_id: CampaignId,
        step_index: usize,
    },

    Paused { campaign_id: CampaignId },

    Resumed { campaign_id: CampaignId },

    Completed {
        campaign_id: CampaignId,
        sent: usize,
        failed: usize,
    },

    Failed { campaign_id: CampaignId, error: String },

    /// Runner state dropped without completing (delete or shutdown).
    Stopped { campaign_id: CampaignId },
}

impl RunnerEvent {
    pub fn campaign_id(&self) -> &CampaignId {
        match self {
            RunnerEvent::Started { campaign_id, .. }
            | RunnerEvent::BatchSent { campaign_id, .. }
            | RunnerEvent::StepAdvanced { campaign_id, .. }
            | RunnerEvent::Paused { campaign_id }
            | RunnerEvent::Resumed { campaign_id }
            | RunnerEvent::Completed { campaign_id, .. }
            | RunnerEvent::Failed { campaign_id, .. }
            | RunnerEvent::Stopped { campaign_id } => campaign_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = RunnerEvent::BatchSent {
            campaign_id: CampaignId::new(),
            step_index: 0,
            sent: 9,
            failed: 1,
            progress: 50,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_sent");
        assert_eq!(json["sent"], 9);
    }

    #[test]
    fn test_campaign_id_accessor() {
        let id = CampaignId::new();
        let event = RunnerEvent::Paused {
            campaign_id: id.clone(),
        };
        assert_eq!(event.campaign_id(), &id);
    }
}
