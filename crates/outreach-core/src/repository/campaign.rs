//! Campaign repository trait definition.

use outreach_types::campaign::{Campaign, CampaignId, CampaignStatus};
use outreach_types::error::RepositoryError;
use outreach_types::lead::{Lead, LeadId};

use super::SortOrder;

/// Filter criteria for listing campaigns.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    /// Sort by `created_at`.
    pub sort_order: Option<SortOrder>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Repository trait for campaign persistence, including the ordered
/// campaign/lead association.
///
/// Implementations fill `Campaign::lead_count` from the association on read.
pub trait CampaignRepository: Send + Sync {
    fn create(
        &self,
        campaign: &Campaign,
    ) -> impl std::future::Future<Output = Result<Campaign, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &CampaignId,
    ) -> impl std::future::Future<Output = Result<Option<Campaign>, RepositoryError>> + Send;

    fn list(
        &self,
        filter: Option<CampaignFilter>,
    ) -> impl std::future::Future<Output = Result<Vec<Campaign>, RepositoryError>> + Send;

    /// Replace the stored record. Returns `NotFound` if it does not exist.
    fn update(
        &self,
        campaign: &Campaign,
    ) -> impl std::future::Future<Output = Result<Campaign, RepositoryError>> + Send;

    /// Delete a campaign and its lead associations.
    fn delete(
        &self,
        id: &CampaignId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the campaign's recipients with `lead_ids`, in order.
    fn set_leads(
        &self,
        id: &CampaignId,
        lead_ids: &[LeadId],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append recipients, skipping those already attached. Returns how many
    /// were added.
    fn add_leads(
        &self,
        id: &CampaignId,
        lead_ids: &[LeadId],
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Recipients in the order they were attached.
    fn list_leads(
        &self,
        id: &CampaignId,
    ) -> impl std::future::Future<Output = Result<Vec<Lead>, RepositoryError>> + Send;
}
