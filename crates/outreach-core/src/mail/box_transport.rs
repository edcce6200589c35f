//! BoxMailTransport -- object-safe dynamic dispatch wrapper for MailTransport.
//!
//! 1. `MailTransportDyn` is object-safe, with boxed futures
//! 2. Blanket impl of `MailTransportDyn` for every `T: MailTransport`
//! 3. `BoxMailTransport` wraps `Box<dyn MailTransportDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use outreach_types::campaign::{Campaign, CampaignId};
use outreach_types::error::MailError;
use outreach_types::mail::{DeliveryStats, OutboundEmail, SendReceipt};

use super::transport::MailTransport;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MailError>> + Send + 'a>>;

/// Object-safe version of [`MailTransport`].
pub trait MailTransportDyn: Send + Sync {
    fn name(&self) -> &str;

    fn send_boxed<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, SendReceipt>;

    fn prepare_campaign_boxed<'a>(&'a self, campaign: &'a Campaign) -> BoxFuture<'a, ()>;

    fn campaign_stats_boxed<'a>(&'a self, campaign_id: &'a CampaignId)
    -> BoxFuture<'a, DeliveryStats>;

    fn verify_boxed(&self) -> BoxFuture<'_, ()>;

    fn unsubscribe_boxed<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ()>;

    fn resubscribe_boxed<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ()>;
}

impl<T: MailTransport> MailTransportDyn for T {
    fn name(&self) -> &str {
        MailTransport::name(self)
    }

    fn send_boxed<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, SendReceipt> {
        Box::pin(self.send(email))
    }

    fn prepare_campaign_boxed<'a>(&'a self, campaign: &'a Campaign) -> BoxFuture<'a, ()> {
        Box::pin(self.prepare_campaign(campaign))
    }

    fn campaign_stats_boxed<'a>(
        &'a self,
        campaign_id: &'a CampaignId,
    ) -> BoxFuture<'a, DeliveryStats> {
        Box::pin(self.campaign_stats(campaign_id))
    }

    fn verify_boxed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.verify())
    }

    fn unsubscribe_boxed<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(self.unsubscribe(address))
    }

    fn resubscribe_boxed<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(self.resubscribe(address))
    }
}

/// Type-erased mail transport for runtime provider selection
/// (SMTP vs Mailgun, or a per-account SMTP connection).
pub struct BoxMailTransport {
    inner: Box<dyn MailTransportDyn + Send + Sync>,
}

impl BoxMailTransport {
    pub fn new<T: MailTransport + 'static>(transport: T) -> Self {
        Self {
            inner: Box::new(transport),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, MailError> {
        self.inner.send_boxed(email).await
    }

    pub async fn prepare_campaign(&self, campaign: &Campaign) -> Result<(), MailError> {
        self.inner.prepare_campaign_boxed(campaign).await
    }

    pub async fn campaign_stats(&self, campaign_id: &CampaignId) -> Result<DeliveryStats, MailError> {
        self.inner.campaign_stats_boxed(campaign_id).await
    }

    pub async fn verify(&self) -> Result<(), MailError> {
        self.inner.verify_boxed().await
    }

    pub async fn unsubscribe(&self, address: &str) -> Result<(), MailError> {
        self.inner.unsubscribe_boxed(address).await
    }

    pub async fn resubscribe(&self, address: &str) -> Result<(), MailError> {
        self.inner.resubscribe_boxed(address).await
    }
}

impl std::fmt::Debug for BoxMailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxMailTransport")
            .field("name", &self.name())
            .finish()
    }
}

/// `BoxMailTransport` is itself a transport, so it can be handed to code
/// that is generic over `MailTransport`.
impl MailTransport for BoxMailTransport {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, MailError> {
        self.inner.send_boxed(email).await
    }

    async fn prepare_campaign(&self, campaign: &Campaign) -> Result<(), MailError> {
        self.inner.prepare_campaign_boxed(campaign).await
    }

    async fn campaign_stats(&self, campaign_id: &CampaignId) -> Result<DeliveryStats, MailError> {
        self.inner.campaign_stats_boxed(campaign_id).await
    }

    async fn verify(&self) -> Result<(), MailError> {
        self.inner.verify_boxed().await
    }

    async fn unsubscribe(&self, address: &str) -> Result<(), MailError> {
        self.inner.unsubscribe_boxed(address).await
    }

    async fn resubscribe(&self, address: &str) -> Result<(), MailError> {
        self.inner.resubscribe_boxed(address).await
    }
}
