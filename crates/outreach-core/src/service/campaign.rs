//! Campaign management service.
//!
//! CRUD over campaigns, recipient assignment, the launch checklist and the
//! dashboard totals. Sending is the runner's job.

use std::collections::HashSet;

use chrono::Utc;

use outreach_types::campaign::{
    Campaign, CampaignId, CampaignMetrics, CampaignStatus, CreateCampaignRequest, DashboardSummary,
    Step, UpdateCampaignRequest,
};
use outreach_types::error::{CampaignError, RepositoryError};
use outreach_types::lead::{Lead, LeadId};

use crate::repository::campaign::{CampaignFilter, CampaignRepository};
use crate::repository::lead::LeadRepository;

fn storage(e: RepositoryError) -> CampaignError {
    match e {
        RepositoryError::NotFound => CampaignError::NotFound,
        other => CampaignError::StorageError(other.to_string()),
    }
}

/// Check a campaign against the launch checklist: a name, at least one
/// recipient and at least one step with content.
pub fn validate_for_launch(campaign: &Campaign) -> Result<(), CampaignError> {
    if campaign.name.trim().is_empty() {
        return Err(CampaignError::NotLaunchable(
            "campaign name is required".to_string(),
        ));
    }
    if campaign.lead_count == 0 {
        return Err(CampaignError::NotLaunchable(
            "add at least one recipient".to_string(),
        ));
    }
    if !campaign
        .steps
        .iter()
        .any(|s| !s.content.trim().is_empty())
    {
        return Err(CampaignError::NotLaunchable(
            "add at least one email step with content".to_string(),
        ));
    }
    Ok(())
}

/// Service for the campaign lifecycle outside of sending.
pub struct CampaignService<C: CampaignRepository, L: LeadRepository> {
    campaigns: C,
    leads: L,
}

impl<C: CampaignRepository, L: LeadRepository> CampaignService<C, L> {
    pub fn new(campaigns: C, leads: L) -> Self {
        Self { campaigns, leads }
    }

    /// Create a draft campaign. Only the name is required.
    pub async fn create_campaign(
        &self,
        request: CreateCampaignRequest,
    ) -> Result<Campaign, CampaignError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(CampaignError::InvalidName(
                "name cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let campaign = Campaign {
            id: CampaignId::new(),
            name,
            status: CampaignStatus::Draft,
            sender: request.sender.unwrap_or_default(),
            reply_to: request.reply_to.filter(|r| !r.trim().is_empty()),
            steps: request.steps.unwrap_or_default(),
            ab_test: request.ab_test,
            schedule: request.schedule.unwrap_or_default(),
            follow_up_rules: request.follow_up_rules.unwrap_or_default(),
            tracking: request.tracking.unwrap_or_default(),
            metrics: CampaignMetrics::default(),
            progress: 0,
            lead_count: 0,
            created_at: now,
            updated_at: now,
        };

        let campaign = self.campaigns.create(&campaign).await.map_err(storage)?;
        tracing::info!(campaign_id = %campaign.id, name = %campaign.name, "campaign created");
        Ok(campaign)
    }

    pub async fn get_campaign(&self, id: &CampaignId) -> Result<Campaign, CampaignError> {
        self.campaigns
            .get_by_id(id)
            .await
            .map_err(storage)?
            .ok_or(CampaignError::NotFound)
    }

    pub async fn list_campaigns(
        &self,
        filter: Option<CampaignFilter>,
    ) -> Result<Vec<Campaign>, CampaignError> {
        self.campaigns.list(filter).await.map_err(storage)
    }

    /// Apply a partial update. `None` fields are left as they are.
    pub async fn update_campaign(
        &self,
        id: &CampaignId,
        request: UpdateCampaignRequest,
    ) -> Result<Campaign, CampaignError> {
        let mut campaign = self.get_campaign(id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CampaignError::InvalidName(
                    "name cannot be empty".to_string(),
                ));
            }
            campaign.name = name;
        }
        if let Some(status) = request.status {
            campaign.status = status;
        }
        if let Some(sender) = request.sender {
            campaign.sender = sender;
        }
        if let Some(reply_to) = request.reply_to {
            campaign.reply_to = Some(reply_to).filter(|r| !r.trim().is_empty());
        }
        if let Some(steps) = request.steps {
            campaign.steps = steps;
        }
        if let Some(ab_test) = request.ab_test {
            campaign.ab_test = Some(ab_test);
        }
        if let Some(schedule) = request.schedule {
            campaign.schedule = schedule;
        }
        if let Some(rules) = request.follow_up_rules {
            campaign.follow_up_rules = rules;
        }
        if let Some(tracking) = request.tracking {
            campaign.tracking = tracking;
        }
        campaign.updated_at = Utc::now();

        self.campaigns.update(&campaign).await.map_err(storage)
    }

    /// Set only the status, used by the runner and the pause/resume commands.
    pub async fn set_status(
        &self,
        id: &CampaignId,
        status: CampaignStatus,
    ) -> Result<Campaign, CampaignError> {
        let mut campaign = self.get_campaign(id).await?;
        campaign.status = status;
        campaign.updated_at = Utc::now();
        self.campaigns.update(&campaign).await.map_err(storage)
    }

    pub async fn delete_campaign(&self, id: &CampaignId) -> Result<(), CampaignError> {
        self.campaigns.delete(id).await.map_err(storage)?;
        tracing::info!(campaign_id = %id, "campaign deleted");
        Ok(())
    }

    /// Append a step to the sequence. Its id is the next free number.
    pub async fn add_step(
        &self,
        id: &CampaignId,
        subject: &str,
        content: &str,
    ) -> Result<Campaign, CampaignError> {
        let mut campaign = self.get_campaign(id).await?;
        let next_id = campaign
            .steps
            .iter()
            .filter_map(|s| s.id.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        campaign
            .steps
            .push(Step::new(next_id.to_string(), subject, content));
        campaign.updated_at = Utc::now();
        self.campaigns.update(&campaign).await.map_err(storage)
    }

    /// Replace the recipients. Repeated ids are dropped, order is kept.
    ///
    /// Every id must refer to a stored lead.
    pub async fn set_leads(
        &self,
        id: &CampaignId,
        lead_ids: Vec<LeadId>,
    ) -> Result<Campaign, CampaignError> {
        // Existence check before touching the association.
        self.get_campaign(id).await?;

        let mut seen = HashSet::new();
        let unique: Vec<LeadId> = lead_ids
            .into_iter()
            .filter(|lead_id| seen.insert(lead_id.clone()))
            .collect();

        for lead_id in &unique {
            if self
                .leads
                .get_by_id(lead_id)
                .await
                .map_err(storage)?
                .is_none()
            {
                return Err(CampaignError::NotLaunchable(format!(
                    "lead {lead_id} does not exist"
                )));
            }
        }

        self.campaigns
            .set_leads(id, &unique)
            .await
            .map_err(storage)?;
        tracing::debug!(campaign_id = %id, count = unique.len(), "campaign recipients replaced");
        self.get_campaign(id).await
    }

    pub async fn campaign_leads(&self, id: &CampaignId) -> Result<Vec<Lead>, CampaignError> {
        self.get_campaign(id).await?;
        self.campaigns.list_leads(id).await.map_err(storage)
    }

    /// Fetch a campaign and run the launch checklist against it.
    pub async fn check_launchable(&self, id: &CampaignId) -> Result<Campaign, CampaignError> {
        let campaign = self.get_campaign(id).await?;
        validate_for_launch(&campaign)?;
        Ok(campaign)
    }

    /// Totals for the dashboard.
    pub async fn dashboard(&self) -> Result<DashboardSummary, CampaignError> {
        let campaigns = self.campaigns.list(None).await.map_err(storage)?;
        let total_leads = self.leads.count().await.map_err(storage)?;

        Ok(DashboardSummary {
            total_campaigns: campaigns.len() as i64,
            active_campaigns: campaigns
                .iter()
                .filter(|c| c.status == CampaignStatus::Active)
                .count() as i64,
            total_leads,
            total_sent: campaigns.iter().map(|c| c.metrics.sent).sum(),
            total_replies: campaigns.iter().map(|c| c.metrics.replies).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRepo, sample_campaign, sample_leads};

    fn service(repo: &MemoryRepo) -> CampaignService<MemoryRepo, MemoryRepo> {
        CampaignService::new(repo.clone(), repo.clone())
    }

    #[tokio::test]
    async fn test_create_campaign_trims_name_and_defaults_to_draft() {
        let repo = MemoryRepo::new();
        let svc = service(&repo);

        let campaign = svc
            .create_campaign(CreateCampaignRequest {
                name: "  Q3 outreach ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(campaign.name, "Q3 outreach");
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert!(campaign.steps.is_empty());
        assert_eq!(campaign.schedule.sending_speed.batch_size, 10);
        assert!(repo.campaign(&campaign.id).is_some());
    }

    #[tokio::test]
    async fn test_create_campaign_rejects_blank_name() {
        let svc = service(&MemoryRepo::new());
        let err = svc
            .create_campaign(CreateCampaignRequest {
                name: "   ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_update_campaign_only_touches_given_fields() {
        let repo = MemoryRepo::new();
        let original = repo.seed(sample_campaign(2), vec![]);
        let svc = service(&repo);

        let updated = svc
            .update_campaign(
                &original.id,
                UpdateCampaignRequest {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.steps.len(), 2);
        assert_eq!(updated.status, CampaignStatus::Draft);
    }

    #[tokio::test]
    async fn test_get_missing_campaign_is_not_found() {
        let svc = service(&MemoryRepo::new());
        let err = svc.get_campaign(&CampaignId::new()).await.unwrap_err();
        assert!(matches!(err, CampaignError::NotFound));
    }

    #[tokio::test]
    async fn test_add_step_numbers_sequentially() {
        let repo = MemoryRepo::new();
        let campaign = repo.seed(sample_campaign(2), vec![]);
        let svc = service(&repo);

        let updated = svc
            .add_step(&campaign.id, "Bump", "Just checking in")
            .await
            .unwrap();
        assert_eq!(updated.steps.len(), 3);
        assert_eq!(updated.steps[2].id, "3");
        assert_eq!(updated.steps[2].subject, "Bump");
    }

    #[tokio::test]
    async fn test_set_leads_dedups_and_keeps_order() {
        let repo = MemoryRepo::new();
        let leads = sample_leads(3);
        let ids: Vec<LeadId> = leads.iter().map(|l| l.id.clone()).collect();
        // Leads stored but not yet attached.
        let holder = repo.seed(sample_campaign(1), leads);
        let campaign = repo.seed(sample_campaign(1), vec![]);
        let svc = service(&repo);

        let updated = svc
            .set_leads(
                &campaign.id,
                vec![ids[2].clone(), ids[0].clone(), ids[2].clone()],
            )
            .await
            .unwrap();
        assert_eq!(updated.lead_count, 2);

        let attached = svc.campaign_leads(&campaign.id).await.unwrap();
        let attached_ids: Vec<_> = attached.iter().map(|l| l.id.clone()).collect();
        assert_eq!(attached_ids, vec![ids[2].clone(), ids[0].clone()]);
        assert_eq!(svc.get_campaign(&holder.id).await.unwrap().lead_count, 3);
    }

    #[tokio::test]
    async fn test_set_leads_rejects_unknown_lead() {
        let repo = MemoryRepo::new();
        let campaign = repo.seed(sample_campaign(1), vec![]);
        let svc = service(&repo);

        let err = svc
            .set_leads(&campaign.id, vec![LeadId::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::NotLaunchable(_)));
    }

    #[test]
    fn test_validate_for_launch_checklist() {
        let mut campaign = sample_campaign(1);
        campaign.lead_count = 0;
        assert!(validate_for_launch(&campaign).is_err());

        campaign.lead_count = 5;
        assert!(validate_for_launch(&campaign).is_ok());

        campaign.steps[0].content = "  ".to_string();
        assert!(validate_for_launch(&campaign).is_err());

        campaign.steps.clear();
        assert!(validate_for_launch(&campaign).is_err());
    }

    #[tokio::test]
    async fn test_dashboard_aggregates() {
        let repo = MemoryRepo::new();
        let mut active = sample_campaign(1);
        active.status = CampaignStatus::Active;
        active.metrics.sent = 40;
        active.metrics.replies = 4;
        repo.seed(active, sample_leads(2));

        let mut done = sample_campaign(1);
        done.status = CampaignStatus::Completed;
        done.metrics.sent = 10;
        done.metrics.replies = 1;
        repo.seed(done, vec![]);

        let summary = service(&repo).dashboard().await.unwrap();
        assert_eq!(
            summary,
            DashboardSummary {
                total_campaigns: 2,
                active_campaigns: 1,
                total_leads: 2,
                total_sent: 50,
                total_replies: 5,
            }
        );
    }
}
