//! Timer-driven batch sender.
//!
//! Each running campaign owns a tokio task that ticks every
//! `RunnerSettings::interval`. A tick sends the current step to the next
//! `batch_size` leads; when the leads run out it moves to the next step, and
//! after the last step it marks the campaign completed. Progress lives in a
//! `DashMap` and is not persisted.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use outreach_types::campaign::{Campaign, CampaignId, CampaignStatus};
use outreach_types::error::{CampaignError, RepositoryError, RunnerError};
use outreach_types::event::RunnerEvent;
use outreach_types::mail::DeliveryStats;

use super::progress::{CampaignProgress, RunStatus, RunnerSettings, percent_complete};
use crate::event::EventBus;
use crate::mail::{BoxMailTransport, choose_variant, compose_step_email};
use crate::repository::campaign::CampaignRepository;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Campaign not running; nothing happened.
    Idle,
    BatchSent { sent: usize, failed: usize },
    StepAdvanced { step_index: usize },
    Completed,
}

struct RunEntry {
    progress: CampaignProgress,
    cancel: Option<CancellationToken>,
}

/// Where a tick picks up, copied out of the run so no map guard is held
/// across awaits.
struct StepPosition {
    step_id: String,
    step_index: usize,
    lead_index: usize,
}

struct RunnerInner<C> {
    campaigns: C,
    transport: BoxMailTransport,
    settings: RunnerSettings,
    runs: DashMap<CampaignId, RunEntry>,
    events: EventBus,
}

/// Drives running campaigns. Cheap to clone; clones share state.
pub struct CampaignRunner<C: CampaignRepository> {
    inner: Arc<RunnerInner<C>>,
}

impl<C: CampaignRepository> Clone for CampaignRunner<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn storage(e: RepositoryError) -> RunnerError {
    match e {
        RepositoryError::NotFound => RunnerError::Campaign(CampaignError::NotFound),
        other => RunnerError::Campaign(CampaignError::StorageError(other.to_string())),
    }
}

/// Copy provider counters onto the campaign.
fn apply_stats(campaign: &mut Campaign, stats: &DeliveryStats, opportunity_rate: f64) {
    let metrics = &mut campaign.metrics;
    metrics.sent = stats.delivered;
    metrics.delivered = stats.delivered;
    metrics.opens = stats.opened;
    metrics.clicks = stats.clicked;
    metrics.replies = stats.replied;
    metrics.bounces = stats.bounced;
    metrics.unsubscribes = stats.unsubscribed;
    metrics.opportunities = (stats.replied as f64 * opportunity_rate).floor() as i64;
}

impl<C: CampaignRepository + 'static> CampaignRunner<C> {
    pub fn new(
        campaigns: C,
        transport: BoxMailTransport,
        settings: RunnerSettings,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                campaigns,
                transport,
                settings,
                runs: DashMap::new(),
                events,
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.inner.settings
    }

    /// Name of the transport campaigns are sent through.
    pub fn transport_name(&self) -> &str {
        self.inner.transport.name()
    }

    /// Snapshot of a campaign's progress, if the runner knows about it.
    pub fn progress(&self, id: &CampaignId) -> Option<CampaignProgress> {
        self.inner.runs.get(id).map(|e| e.progress.clone())
    }

    /// Snapshot of every tracked campaign.
    pub fn all_progress(&self) -> Vec<CampaignProgress> {
        self.inner
            .runs
            .iter()
            .map(|e| e.value().progress.clone())
            .collect()
    }

    fn is_live(&self, id: &CampaignId) -> bool {
        self.inner
            .runs
            .get(id)
            .is_some_and(|e| e.progress.status.is_live())
    }

    /// Start sending a campaign from its first step.
    ///
    /// Fails if the campaign is already running or paused, has no steps, or
    /// has no leads.
    pub async fn start(&self, id: &CampaignId) -> Result<CampaignProgress, RunnerError> {
        if self.is_live(id) {
            return Err(RunnerError::AlreadyRunning);
        }

        let campaign = self.load(id).await?;
        let first_step_id = campaign
            .steps
            .first()
            .map(|s| s.id.clone())
            .ok_or(RunnerError::NoSteps)?;
        let leads = self
            .inner
            .campaigns
            .list_leads(id)
            .await
            .map_err(storage)?;
        if leads.is_empty() {
            return Err(RunnerError::NoLeads);
        }

        self.inner.transport.prepare_campaign(&campaign).await?;

        let progress = CampaignProgress::new(id.clone(), first_step_id);
        let entry = RunEntry {
            progress: progress.clone(),
            cancel: None,
        };
        match self.inner.runs.entry(id.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().progress.status.is_live() {
                    return Err(RunnerError::AlreadyRunning);
                }
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }

        if let Err(e) = self.save_status(id, CampaignStatus::Active).await {
            self.inner.runs.remove(id);
            return Err(e);
        }

        let token = self.spawn_timer(id.clone());
        self.set_cancel(id, token);

        self.inner.events.publish(RunnerEvent::Started {
            campaign_id: id.clone(),
            lead_count: leads.len(),
            step_count: campaign.steps.len(),
        });
        tracing::info!(
            campaign_id = %id,
            leads = leads.len(),
            steps = campaign.steps.len(),
            transport = self.inner.transport.name(),
            "campaign started"
        );
        Ok(progress)
    }

    /// Stop the timer and mark the campaign paused.
    pub async fn pause(&self, id: &CampaignId) -> Result<CampaignProgress, RunnerError> {
        let (progress, token) = match self.inner.runs.get_mut(id) {
            Some(mut entry) if entry.progress.status == RunStatus::Running => {
                entry.progress.status = RunStatus::Paused;
                (entry.progress.clone(), entry.cancel.take())
            }
            _ => return Err(RunnerError::NotRunning),
        };
        if let Some(token) = token {
            token.cancel();
        }

        self.save_status(id, CampaignStatus::Paused).await?;
        self.inner.events.publish(RunnerEvent::Paused {
            campaign_id: id.clone(),
        });
        tracing::info!(campaign_id = %id, lead_index = progress.lead_index, "campaign paused");
        Ok(progress)
    }

    /// Restart the timer of a paused campaign where it left off.
    pub async fn resume(&self, id: &CampaignId) -> Result<CampaignProgress, RunnerError> {
        let progress = match self.inner.runs.get_mut(id) {
            Some(mut entry) if entry.progress.status == RunStatus::Paused => {
                entry.progress.status = RunStatus::Running;
                entry.progress.clone()
            }
            _ => return Err(RunnerError::NotPaused),
        };

        let token = self.spawn_timer(id.clone());
        self.set_cancel(id, token);

        self.save_status(id, CampaignStatus::Active).await?;
        self.inner.events.publish(RunnerEvent::Resumed {
            campaign_id: id.clone(),
        });
        tracing::info!(campaign_id = %id, "campaign resumed");
        Ok(progress)
    }

    /// Cancel the timer and forget the campaign's progress.
    ///
    /// Returns whether the runner knew about the campaign.
    pub fn stop(&self, id: &CampaignId) -> bool {
        match self.inner.runs.remove(id) {
            Some((_, entry)) => {
                if let Some(token) = entry.cancel {
                    token.cancel();
                }
                self.inner.events.publish(RunnerEvent::Stopped {
                    campaign_id: id.clone(),
                });
                tracing::debug!(campaign_id = %id, "campaign runner state dropped");
                true
            }
            None => false,
        }
    }

    /// Stop every campaign. Used on server shutdown.
    pub fn shutdown(&self) {
        let ids: Vec<CampaignId> = self.inner.runs.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.stop(&id);
        }
    }

    /// Process the next batch of a running campaign.
    ///
    /// A no-op unless the campaign is running. Errors outside the per-lead
    /// sends put the campaign into the error state and stop its timer.
    pub async fn tick(&self, id: &CampaignId) -> Result<TickOutcome, RunnerError> {
        let position = match self.inner.runs.get(id) {
            Some(entry) if entry.progress.status == RunStatus::Running => StepPosition {
                step_id: entry.progress.step_id.clone(),
                step_index: entry.progress.step_index,
                lead_index: entry.progress.lead_index,
            },
            _ => return Ok(TickOutcome::Idle),
        };

        match self.process_batch(id, position).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.fail(id, &e).await;
                Err(e)
            }
        }
    }

    async fn process_batch(
        &self,
        id: &CampaignId,
        position: StepPosition,
    ) -> Result<TickOutcome, RunnerError> {
        let campaign = self.load(id).await?;
        let leads = self
            .inner
            .campaigns
            .list_leads(id)
            .await
            .map_err(storage)?;
        let total_steps = campaign.steps.len();

        // Steps may be inserted, reordered or removed while running, so the
        // tracked step id wins over its old index.
        let (step_index, lead_index) = match campaign
            .steps
            .iter()
            .position(|s| s.id == position.step_id)
        {
            Some(index) => (index, position.lead_index),
            None if position.step_index < total_steps => (position.step_index, 0),
            None => {
                self.complete(id).await?;
                return Ok(TickOutcome::Completed);
            }
        };
        let step = &campaign.steps[step_index];
        if step_index != position.step_index || step.id != position.step_id {
            tracing::debug!(
                campaign_id = %id,
                step_id = %step.id,
                step_index,
                "campaign steps changed while running"
            );
            self.update_run(id, |p| {
                p.step_index = step_index;
                p.step_id = step.id.clone();
                p.lead_index = lead_index;
            });
        }

        if lead_index >= leads.len() {
            let next = step_index + 1;
            if next < total_steps {
                let next_id = campaign.steps[next].id.clone();
                self.update_run(id, |p| {
                    p.step_index = next;
                    p.step_id = next_id;
                    p.lead_index = 0;
                });
                self.inner.events.publish(RunnerEvent::StepAdvanced {
                    campaign_id: id.clone(),
                    step_index: next,
                });
                tracing::info!(campaign_id = %id, step_index = next, "campaign advanced to next step");
                return Ok(TickOutcome::StepAdvanced { step_index: next });
            }
            self.complete(id).await?;
            return Ok(TickOutcome::Completed);
        }

        let batch_end = (lead_index + self.inner.settings.batch_size).min(leads.len());
        let mut sent = 0;
        let mut failed = 0;
        for (offset, lead) in leads[lead_index..batch_end].iter().enumerate() {
            let variant = choose_variant(&campaign, step, lead_index + offset);
            let email = compose_step_email(&campaign, step, variant, lead);
            match self.inner.transport.send(&email).await {
                Ok(receipt) => {
                    sent += 1;
                    tracing::debug!(
                        campaign_id = %id,
                        to = %lead.email,
                        message_id = %receipt.message_id,
                        "campaign email sent"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(campaign_id = %id, to = %lead.email, error = %e, "campaign email failed");
                }
            }
        }

        let tracked = self.update_run(id, |p| {
            p.lead_index = batch_end;
            p.sent += sent;
            p.failed += failed;
        });
        if !tracked {
            // Stopped while the batch was in flight.
            return Ok(TickOutcome::Idle);
        }

        let stats = self.inner.transport.campaign_stats(id).await?;
        let percent = percent_complete(step_index, batch_end, total_steps, leads.len());

        let mut campaign = self.load(id).await?;
        apply_stats(&mut campaign, &stats, self.inner.settings.opportunity_rate);
        campaign.progress = percent;
        campaign.updated_at = Utc::now();
        self.inner
            .campaigns
            .update(&campaign)
            .await
            .map_err(storage)?;

        self.inner.events.publish(RunnerEvent::BatchSent {
            campaign_id: id.clone(),
            step_index,
            sent,
            failed,
            progress: percent,
        });
        tracing::info!(
            campaign_id = %id,
            step_index,
            sent,
            failed,
            progress = percent,
            "campaign batch processed"
        );
        Ok(TickOutcome::BatchSent { sent, failed })
    }

    async fn complete(&self, id: &CampaignId) -> Result<(), RunnerError> {
        let (token, sent, failed) = match self.inner.runs.get_mut(id) {
            Some(mut entry) => {
                entry.progress.status = RunStatus::Completed;
                (entry.cancel.take(), entry.progress.sent, entry.progress.failed)
            }
            None => (None, 0, 0),
        };
        if let Some(token) = token {
            token.cancel();
        }

        let mut campaign = self.load(id).await?;
        campaign.status = CampaignStatus::Completed;
        campaign.progress = 100;
        campaign.updated_at = Utc::now();
        self.inner
            .campaigns
            .update(&campaign)
            .await
            .map_err(storage)?;

        self.inner.events.publish(RunnerEvent::Completed {
            campaign_id: id.clone(),
            sent,
            failed,
        });
        tracing::info!(campaign_id = %id, sent, failed, "campaign completed");
        Ok(())
    }

    async fn fail(&self, id: &CampaignId, error: &RunnerError) {
        let token = match self.inner.runs.get_mut(id) {
            Some(mut entry) => {
                entry.progress.status = RunStatus::Error;
                entry.progress.error = Some(error.to_string());
                entry.cancel.take()
            }
            None => None,
        };
        if let Some(token) = token {
            token.cancel();
        }

        if let Err(e) = self.save_status(id, CampaignStatus::Error).await {
            tracing::warn!(campaign_id = %id, error = %e, "could not record campaign error status");
        }
        self.inner.events.publish(RunnerEvent::Failed {
            campaign_id: id.clone(),
            error: error.to_string(),
        });
        tracing::error!(campaign_id = %id, error = %error, "campaign batch failed");
    }

    async fn load(&self, id: &CampaignId) -> Result<Campaign, RunnerError> {
        self.inner
            .campaigns
            .get_by_id(id)
            .await
            .map_err(storage)?
            .ok_or(RunnerError::Campaign(CampaignError::NotFound))
    }

    async fn save_status(&self, id: &CampaignId, status: CampaignStatus) -> Result<(), RunnerError> {
        let mut campaign = self.load(id).await?;
        campaign.status = status;
        campaign.updated_at = Utc::now();
        self.inner
            .campaigns
            .update(&campaign)
            .await
            .map_err(storage)?;
        Ok(())
    }

    fn update_run(&self, id: &CampaignId, f: impl FnOnce(&mut CampaignProgress)) -> bool {
        match self.inner.runs.get_mut(id) {
            Some(mut entry) => {
                f(&mut entry.progress);
                true
            }
            None => false,
        }
    }

    fn set_cancel(&self, id: &CampaignId, token: CancellationToken) {
        match self.inner.runs.get_mut(id) {
            Some(mut entry) => entry.cancel = Some(token),
            None => token.cancel(),
        }
    }

    fn spawn_timer(&self, id: CampaignId) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let runner = self.clone();
        let period = self.inner.settings.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        // Failures are recorded on the progress entry by tick().
                        let _ = runner.tick(&id).await;
                    }
                }
            }
            tracing::debug!(campaign_id = %id, "campaign timer stopped");
        });

        token
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{MemoryRepo, MockTransport, sample_campaign, sample_leads};
    use outreach_types::campaign::{AbTest, Step};

    fn settings(batch_size: usize) -> RunnerSettings {
        RunnerSettings {
            batch_size,
            interval: Duration::from_secs(60),
            opportunity_rate: 0.3,
        }
    }

    fn runner(repo: &MemoryRepo, transport: &MockTransport, batch: usize) -> CampaignRunner<MemoryRepo> {
        CampaignRunner::new(
            repo.clone(),
            transport.boxed(),
            settings(batch),
            EventBus::new(64),
        )
    }

    #[tokio::test]
    async fn test_start_requires_steps_and_leads() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 10);

        let no_steps = repo.seed(sample_campaign(0), sample_leads(2));
        assert!(matches!(
            runner.start(&no_steps.id).await.unwrap_err(),
            RunnerError::NoSteps
        ));

        let no_leads = repo.seed(sample_campaign(1), vec![]);
        assert!(matches!(
            runner.start(&no_leads.id).await.unwrap_err(),
            RunnerError::NoLeads
        ));

        assert!(matches!(
            runner.start(&CampaignId::new()).await.unwrap_err(),
            RunnerError::Campaign(CampaignError::NotFound)
        ));
        assert!(transport.prepared().is_empty());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 10);
        let campaign = repo.seed(sample_campaign(1), sample_leads(3));

        let progress = runner.start(&campaign.id).await.unwrap();
        assert_eq!(progress.step_index, 0);
        assert_eq!(progress.lead_index, 0);
        assert_eq!(progress.status, RunStatus::Running);
        assert_eq!(repo.campaign(&campaign.id).unwrap().status, CampaignStatus::Active);
        assert_eq!(transport.prepared(), vec![campaign.id.clone()]);

        let err = runner.start(&campaign.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Campaign is already running");

        runner.pause(&campaign.id).await.unwrap();
        assert!(matches!(
            runner.start(&campaign.id).await.unwrap_err(),
            RunnerError::AlreadyRunning
        ));
        runner.shutdown();
    }

    #[tokio::test]
    async fn test_tick_sends_in_batches_then_completes() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 10);
        let campaign = repo.seed(sample_campaign(1), sample_leads(25));
        runner.start(&campaign.id).await.unwrap();

        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::BatchSent { sent: 10, failed: 0 }
        );
        assert_eq!(runner.progress(&campaign.id).unwrap().lead_index, 10);
        assert_eq!(repo.campaign(&campaign.id).unwrap().progress, 40);

        runner.tick(&campaign.id).await.unwrap();
        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::BatchSent { sent: 5, failed: 0 }
        );
        assert_eq!(transport.sent().len(), 25);

        assert_eq!(runner.tick(&campaign.id).await.unwrap(), TickOutcome::Completed);
        let stored = repo.campaign(&campaign.id).unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(runner.progress(&campaign.id).unwrap().status, RunStatus::Completed);

        // Finished campaigns ignore further ticks and may be started again.
        assert_eq!(runner.tick(&campaign.id).await.unwrap(), TickOutcome::Idle);
        runner.start(&campaign.id).await.unwrap();
        runner.shutdown();
    }

    #[tokio::test]
    async fn test_tick_advances_through_steps() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 10);
        let campaign = repo.seed(sample_campaign(2), sample_leads(3));
        runner.start(&campaign.id).await.unwrap();

        runner.tick(&campaign.id).await.unwrap();
        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::StepAdvanced { step_index: 1 }
        );
        let progress = runner.progress(&campaign.id).unwrap();
        assert_eq!(progress.step_id, "2");
        assert_eq!(progress.lead_index, 0);

        runner.tick(&campaign.id).await.unwrap();
        assert_eq!(runner.tick(&campaign.id).await.unwrap(), TickOutcome::Completed);

        let sent = transport.sent();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[0].subject, "Step 1 for Lead0");
        assert_eq!(sent[3].subject, "Step 2 for Lead0");
        assert_eq!(runner.progress(&campaign.id).unwrap().sent, 6);
    }

    #[tokio::test]
    async fn test_tick_follows_step_id_when_steps_change() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 2);
        let campaign = repo.seed(sample_campaign(2), sample_leads(3));
        runner.start(&campaign.id).await.unwrap();
        runner.tick(&campaign.id).await.unwrap();

        // A new first step pushes the running step to index 1.
        let mut edited = repo.campaign(&campaign.id).unwrap();
        edited
            .steps
            .insert(0, Step::new("9", "Intro for {{firstName}}", "Hi"));
        repo.update(&edited).await.unwrap();

        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::BatchSent { sent: 1, failed: 0 }
        );
        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].subject, "Step 1 for Lead2");
        let progress = runner.progress(&campaign.id).unwrap();
        assert_eq!(progress.step_id, "1");
        assert_eq!(progress.step_index, 1);

        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::StepAdvanced { step_index: 2 }
        );
        assert_eq!(runner.progress(&campaign.id).unwrap().step_id, "2");

        // Removing the running step falls back to whatever now holds its
        // index, from the first lead.
        let mut edited = repo.campaign(&campaign.id).unwrap();
        edited.steps.retain(|s| s.id != "2");
        edited.steps.push(Step::new("3", "Step 3 for {{firstName}}", "Bye"));
        repo.update(&edited).await.unwrap();

        runner.tick(&campaign.id).await.unwrap();
        let progress = runner.progress(&campaign.id).unwrap();
        assert_eq!(progress.step_id, "3");
        assert_eq!(progress.lead_index, 2);
        assert_eq!(transport.sent()[3].subject, "Step 3 for Lead0");
        runner.shutdown();
    }

    #[tokio::test]
    async fn test_failed_sends_are_counted_not_fatal() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        transport.reject("lead1@test.io");
        let runner = runner(&repo, &transport, 10);
        let campaign = repo.seed(sample_campaign(1), sample_leads(3));
        runner.start(&campaign.id).await.unwrap();

        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::BatchSent { sent: 2, failed: 1 }
        );
        let progress = runner.progress(&campaign.id).unwrap();
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.status, RunStatus::Running);
        runner.shutdown();
    }

    #[tokio::test]
    async fn test_stats_failure_puts_campaign_in_error() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 10);
        let campaign = repo.seed(sample_campaign(1), sample_leads(3));
        let mut events = runner.events().subscribe();
        runner.start(&campaign.id).await.unwrap();

        transport.fail_stats(true);
        assert!(runner.tick(&campaign.id).await.is_err());

        let progress = runner.progress(&campaign.id).unwrap();
        assert_eq!(progress.status, RunStatus::Error);
        assert!(progress.error.unwrap().contains("502"));
        assert_eq!(repo.campaign(&campaign.id).unwrap().status, CampaignStatus::Error);
        assert_eq!(runner.tick(&campaign.id).await.unwrap(), TickOutcome::Idle);

        assert!(matches!(events.recv().await.unwrap(), RunnerEvent::Started { .. }));
        assert!(matches!(events.recv().await.unwrap(), RunnerEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn test_metrics_follow_provider_stats() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        transport.set_stats(DeliveryStats {
            delivered: 10,
            opened: 8,
            clicked: 3,
            replied: 7,
            bounced: 1,
            unsubscribed: 0,
        });
        let runner = runner(&repo, &transport, 10);
        let campaign = repo.seed(sample_campaign(1), sample_leads(10));
        runner.start(&campaign.id).await.unwrap();
        runner.tick(&campaign.id).await.unwrap();

        let metrics = repo.campaign(&campaign.id).unwrap().metrics;
        assert_eq!(metrics.sent, 10);
        assert_eq!(metrics.clicks, 3);
        assert_eq!(metrics.replies, 7);
        assert_eq!(metrics.opportunities, 2);
        runner.shutdown();
    }

    #[tokio::test]
    async fn test_pause_and_resume_state_errors() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 2);
        let campaign = repo.seed(sample_campaign(1), sample_leads(4));

        assert_eq!(
            runner.pause(&campaign.id).await.unwrap_err().to_string(),
            "Campaign is not running"
        );

        runner.start(&campaign.id).await.unwrap();
        assert_eq!(
            runner.resume(&campaign.id).await.unwrap_err().to_string(),
            "Campaign is not paused"
        );

        runner.pause(&campaign.id).await.unwrap();
        assert_eq!(repo.campaign(&campaign.id).unwrap().status, CampaignStatus::Paused);
        assert_eq!(runner.tick(&campaign.id).await.unwrap(), TickOutcome::Idle);
        assert!(transport.sent().is_empty());

        runner.resume(&campaign.id).await.unwrap();
        assert_eq!(repo.campaign(&campaign.id).unwrap().status, CampaignStatus::Active);
        assert_eq!(
            runner.tick(&campaign.id).await.unwrap(),
            TickOutcome::BatchSent { sent: 2, failed: 0 }
        );

        assert!(runner.stop(&campaign.id));
        assert!(runner.progress(&campaign.id).is_none());
        assert!(!runner.stop(&campaign.id));
    }

    #[tokio::test]
    async fn test_ab_variants_rotate_across_leads() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 10);
        let mut campaign = sample_campaign(1);
        campaign.ab_test = Some(AbTest {
            enabled: true,
            ..Default::default()
        });
        campaign.steps[0].add_variant().subject = "Variant subject".to_string();
        let campaign = repo.seed(campaign, sample_leads(4));

        runner.start(&campaign.id).await.unwrap();
        runner.tick(&campaign.id).await.unwrap();

        let subjects: Vec<String> = transport.sent().into_iter().map(|e| e.subject).collect();
        assert_eq!(
            subjects,
            vec![
                "Step 1 for Lead0",
                "Variant subject",
                "Step 1 for Lead2",
                "Variant subject"
            ]
        );
        runner.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_sends_batches_on_interval() {
        let repo = MemoryRepo::new();
        let transport = MockTransport::new();
        let runner = runner(&repo, &transport, 2);
        let campaign = repo.seed(sample_campaign(1), sample_leads(3));
        let mut events = runner.events().subscribe();

        runner.start(&campaign.id).await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), RunnerEvent::Started { .. }));

        let before = Instant::now();
        match events.recv().await.unwrap() {
            RunnerEvent::BatchSent { sent, .. } => assert_eq!(sent, 2),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(before.elapsed() >= Duration::from_secs(60));

        assert!(matches!(events.recv().await.unwrap(), RunnerEvent::BatchSent { sent: 1, .. }));
        assert!(matches!(events.recv().await.unwrap(), RunnerEvent::Completed { sent: 3, .. }));
        assert_eq!(repo.campaign(&campaign.id).unwrap().status, CampaignStatus::Completed);
    }
}
