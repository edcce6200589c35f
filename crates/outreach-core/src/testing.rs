//! In-memory repository and transport doubles shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use outreach_types::campaign::{
    Campaign, CampaignId, CampaignMetrics, CampaignStatus, ScheduleSettings, SenderProfile, Step,
    TrackingSettings,
};
use outreach_types::error::{MailError, RepositoryError};
use outreach_types::lead::{Lead, LeadId};
use outreach_types::mail::{DeliveryStats, MailAccount, MailAccountId, OutboundEmail, SendReceipt};

use crate::mail::{BoxMailTransport, MailTransport, TransportFactory};
use crate::repository::campaign::{CampaignFilter, CampaignRepository};
use crate::repository::lead::{LeadFilter, LeadRepository};
use crate::repository::mail_account::MailAccountRepository;

/// A draft campaign with `steps` personalized steps and ids "1", "2", ...
pub fn sample_campaign(steps: usize) -> Campaign {
    let now = Utc::now();
    Campaign {
        id: CampaignId::new(),
        name: "Launch".to_string(),
        status: CampaignStatus::Draft,
        sender: SenderProfile::default(),
        reply_to: None,
        steps: (1..=steps)
            .map(|n| {
                Step::new(
                    n.to_string(),
                    format!("Step {n} for {{{{firstName}}}}"),
                    "Hello {{firstName}}",
                )
            })
            .collect(),
        ab_test: None,
        schedule: ScheduleSettings::default(),
        follow_up_rules: Vec::new(),
        tracking: TrackingSettings::default(),
        metrics: CampaignMetrics::default(),
        progress: 0,
        lead_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Leads `lead0@test.io`, `lead1@test.io`, ...
pub fn sample_leads(count: usize) -> Vec<Lead> {
    (0..count)
        .map(|i| {
            let mut lead = Lead::new(&format!("lead{i}@test.io"));
            lead.first_name = Some(format!("Lead{i}"));
            lead
        })
        .collect()
}

#[derive(Default)]
struct MemoryState {
    campaigns: HashMap<CampaignId, Campaign>,
    leads: Vec<Lead>,
    links: HashMap<CampaignId, Vec<LeadId>>,
    accounts: Vec<MailAccount>,
}

/// One in-memory store implementing every repository trait.
#[derive(Clone, Default)]
pub struct MemoryRepo {
    state: Arc<Mutex<MemoryState>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a campaign with attached leads.
    pub fn seed(&self, mut campaign: Campaign, leads: Vec<Lead>) -> Campaign {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<LeadId> = leads.iter().map(|l| l.id.clone()).collect();
        campaign.lead_count = ids.len() as i64;
        state.links.insert(campaign.id.clone(), ids);
        state.leads.extend(leads);
        state.campaigns.insert(campaign.id.clone(), campaign.clone());
        campaign
    }

    pub fn campaign(&self, id: &CampaignId) -> Option<Campaign> {
        let state = self.state.lock().unwrap();
        state.campaigns.get(id).cloned().map(|c| with_count(&state, c))
    }

    pub fn lead_total(&self) -> usize {
        self.state.lock().unwrap().leads.len()
    }

    /// Make every subsequent write fail with a query error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

fn with_count(state: &MemoryState, mut campaign: Campaign) -> Campaign {
    campaign.lead_count = state.links.get(&campaign.id).map_or(0, |l| l.len() as i64);
    campaign
}

impl CampaignRepository for MemoryRepo {
    async fn create(&self, campaign: &Campaign) -> Result<Campaign, RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        state.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(campaign.clone())
    }

    async fn get_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        Ok(self.campaign(id))
    }

    async fn list(&self, filter: Option<CampaignFilter>) -> Result<Vec<Campaign>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let filter = filter.unwrap_or_default();
        let mut out: Vec<Campaign> = state
            .campaigns
            .values()
            .filter(|c| filter.status.as_ref().is_none_or(|s| &c.status == s))
            .cloned()
            .map(|c| with_count(&state, c))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update(&self, campaign: &Campaign) -> Result<Campaign, RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        if !state.campaigns.contains_key(&campaign.id) {
            return Err(RepositoryError::NotFound);
        }
        state.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(with_count(&state, campaign.clone()))
    }

    async fn delete(&self, id: &CampaignId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.links.remove(id);
        state
            .campaigns
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_leads(&self, id: &CampaignId, lead_ids: &[LeadId]) -> Result<(), RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        state.links.insert(id.clone(), lead_ids.to_vec());
        Ok(())
    }

    async fn add_leads(&self, id: &CampaignId, lead_ids: &[LeadId]) -> Result<u64, RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let links = state.links.entry(id.clone()).or_default();
        let mut added = 0;
        for lead_id in lead_ids {
            if !links.contains(lead_id) {
                links.push(lead_id.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    async fn list_leads(&self, id: &CampaignId) -> Result<Vec<Lead>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let ids = state.links.get(id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|lead_id| state.leads.iter().find(|l| &l.id == lead_id).cloned())
            .collect())
    }
}

impl LeadRepository for MemoryRepo {
    async fn create(&self, lead: &Lead) -> Result<Lead, RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        if state.leads.iter().any(|l| l.email == lead.email) {
            return Err(RepositoryError::Conflict(lead.email.clone()));
        }
        state.leads.push(lead.clone());
        Ok(lead.clone())
    }

    async fn insert_many(&self, leads: &[Lead]) -> Result<u64, RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        let existing: HashSet<String> = state.leads.iter().map(|l| l.email.clone()).collect();
        if let Some(dup) = leads.iter().find(|l| existing.contains(&l.email)) {
            return Err(RepositoryError::Conflict(dup.email.clone()));
        }
        state.leads.extend(leads.iter().cloned());
        Ok(leads.len() as u64)
    }

    async fn get_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.leads.iter().find(|l| &l.id == id).cloned())
    }

    async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<Lead>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .leads
            .iter()
            .filter(|l| emails.contains(&l.email))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: Option<LeadFilter>) -> Result<Vec<Lead>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let filter = filter.unwrap_or_default();
        Ok(state
            .leads
            .iter()
            .filter(|l| {
                filter.industry.as_ref().is_none_or(|i| l.industry.as_ref() == Some(i))
                    && filter.region.as_ref().is_none_or(|r| l.region.as_ref() == Some(r))
                    && filter.tag.as_ref().is_none_or(|t| l.tags.contains(t))
                    && filter.search.as_ref().is_none_or(|s| l.email.contains(s.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.state.lock().unwrap().leads.len() as i64)
    }

    async fn delete(&self, id: &LeadId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.leads.len();
        state.leads.retain(|l| &l.id != id);
        if state.leads.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[LeadId]) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.leads.len();
        state.leads.retain(|l| !ids.contains(&l.id));
        Ok((before - state.leads.len()) as u64)
    }
}

impl MailAccountRepository for MemoryRepo {
    async fn save(&self, account: &MailAccount) -> Result<MailAccount, RepositoryError> {
        self.check_write()?;
        let mut state = self.state.lock().unwrap();
        state.accounts.retain(|a| a.id != account.id);
        state.accounts.push(account.clone());
        Ok(account.clone())
    }

    async fn get_by_id(&self, id: &MailAccountId) -> Result<Option<MailAccount>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.accounts.iter().find(|a| &a.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<MailAccount>, RepositoryError> {
        let mut accounts = self.state.lock().unwrap().accounts.clone();
        accounts.sort_by(|a, b| a.account_name.cmp(&b.account_name));
        Ok(accounts)
    }

    async fn delete(&self, id: &MailAccountId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.accounts.len();
        state.accounts.retain(|a| &a.id != id);
        if state.accounts.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
struct TransportState {
    sent: Vec<OutboundEmail>,
    prepared: Vec<CampaignId>,
    reject: HashSet<String>,
    stats: Option<DeliveryStats>,
    stats_error: bool,
    verify_error: bool,
}

/// Records every message; recipients in the reject list fail.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, email: &str) {
        self.state.lock().unwrap().reject.insert(email.to_string());
    }

    pub fn set_stats(&self, stats: DeliveryStats) {
        self.state.lock().unwrap().stats = Some(stats);
    }

    pub fn fail_stats(&self, fail: bool) {
        self.state.lock().unwrap().stats_error = fail;
    }

    pub fn fail_verify(&self, fail: bool) {
        self.state.lock().unwrap().verify_error = fail;
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn prepared(&self) -> Vec<CampaignId> {
        self.state.lock().unwrap().prepared.clone()
    }

    pub fn boxed(&self) -> BoxMailTransport {
        BoxMailTransport::new(self.clone())
    }
}

impl MailTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, MailError> {
        let mut state = self.state.lock().unwrap();
        if state.reject.contains(&email.to) {
            return Err(MailError::Transport(format!("rejected {}", email.to)));
        }
        state.sent.push(email.clone());
        Ok(SendReceipt {
            message_id: format!("<{}@mock>", state.sent.len()),
            transport: "mock".to_string(),
        })
    }

    async fn prepare_campaign(&self, campaign: &Campaign) -> Result<(), MailError> {
        self.state.lock().unwrap().prepared.push(campaign.id.clone());
        Ok(())
    }

    async fn campaign_stats(&self, _campaign_id: &CampaignId) -> Result<DeliveryStats, MailError> {
        let state = self.state.lock().unwrap();
        if state.stats_error {
            return Err(MailError::Provider {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(state.stats.unwrap_or(DeliveryStats {
            delivered: state.sent.len() as i64,
            ..Default::default()
        }))
    }

    async fn verify(&self) -> Result<(), MailError> {
        if self.state.lock().unwrap().verify_error {
            Err(MailError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Hands out clones of one mock transport for every account.
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    pub transport: MockTransport,
}

impl TransportFactory for MockTransportFactory {
    fn for_account(&self, _account: &MailAccount) -> Result<BoxMailTransport, MailError> {
        Ok(self.transport.boxed())
    }
}
