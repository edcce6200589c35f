//! MailTransport trait definition.
//!
//! Implementations live in outreach-infra (`SmtpTransport`, `MailgunTransport`).

use outreach_types::campaign::{Campaign, CampaignId};
use outreach_types::error::MailError;
use outreach_types::mail::{DeliveryStats, MailAccount, OutboundEmail, SendReceipt};

use super::box_transport::BoxMailTransport;

/// A provider that can deliver mail and report on what it delivered.
///
/// Uses native async fn in traits (RPITIT). Wrap in [`BoxMailTransport`]
/// when the concrete provider is chosen at runtime.
pub trait MailTransport: Send + Sync {
    /// Short provider name (e.g., "smtp", "mailgun").
    fn name(&self) -> &str;

    /// Deliver one message.
    fn send(
        &self,
        email: &OutboundEmail,
    ) -> impl std::future::Future<Output = Result<SendReceipt, MailError>> + Send;

    /// Register anything the provider needs before a campaign starts
    /// (server-side templates, for instance). A no-op for plain SMTP.
    fn prepare_campaign(
        &self,
        campaign: &Campaign,
    ) -> impl std::future::Future<Output = Result<(), MailError>> + Send;

    /// Delivery counters for messages tagged with this campaign.
    fn campaign_stats(
        &self,
        campaign_id: &CampaignId,
    ) -> impl std::future::Future<Output = Result<DeliveryStats, MailError>> + Send;

    /// Check credentials and connectivity without sending anything.
    fn verify(&self) -> impl std::future::Future<Output = Result<(), MailError>> + Send;

    /// Add `address` to the provider's suppression list. Providers without
    /// one fail with [`MailError::NotConfigured`].
    fn unsubscribe(
        &self,
        _address: &str,
    ) -> impl std::future::Future<Output = Result<(), MailError>> + Send {
        std::future::ready(Err(no_suppression_list(self.name())))
    }

    /// Take `address` back off the suppression list.
    fn resubscribe(
        &self,
        _address: &str,
    ) -> impl std::future::Future<Output = Result<(), MailError>> + Send {
        std::future::ready(Err(no_suppression_list(self.name())))
    }
}

fn no_suppression_list(transport: &str) -> MailError {
    MailError::NotConfigured(format!(
        "the {transport} transport does not manage unsubscribes"
    ))
}

/// Builds a transport for a stored mail account.
pub trait TransportFactory: Send + Sync {
    fn for_account(&self, account: &MailAccount) -> Result<BoxMailTransport, MailError>;
}
