//! Placeholder transport used when no mail provider is set up.

use outreach_core::mail::MailTransport;
use outreach_types::campaign::{Campaign, CampaignId};
use outreach_types::error::MailError;
use outreach_types::mail::{DeliveryStats, OutboundEmail, SendReceipt};

/// Fails every call with [`MailError::NotConfigured`] carrying `reason`.
#[derive(Debug, Clone)]
pub struct UnconfiguredTransport {
    reason: String,
}

impl UnconfiguredTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> MailError {
        MailError::NotConfigured(self.reason.clone())
    }
}

impl MailTransport for UnconfiguredTransport {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn send(&self, _email: &OutboundEmail) -> Result<SendReceipt, MailError> {
        Err(self.error())
    }

    async fn prepare_campaign(&self, _campaign: &Campaign) -> Result<(), MailError> {
        Err(self.error())
    }

    async fn campaign_stats(&self, _campaign_id: &CampaignId) -> Result<DeliveryStats, MailError> {
        Err(self.error())
    }

    async fn verify(&self) -> Result<(), MailError> {
        Err(self.error())
    }

    async fn unsubscribe(&self, _address: &str) -> Result<(), MailError> {
        Err(self.error())
    }

    async fn resubscribe(&self, _address: &str) -> Result<(), MailError> {
        Err(self.error())
    }
}
