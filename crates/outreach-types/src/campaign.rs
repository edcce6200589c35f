use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a campaign, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub Uuid);

impl CampaignId {
    /// Create a new CampaignId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CampaignId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A configured outreach job: recipients, sequence content, schedule and
/// follow-up automation.
///
/// Leads are attached through the campaign/lead association; `lead_count`
/// mirrors the number currently attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub status: CampaignStatus,
    pub sender: SenderProfile,
    pub reply_to: Option<String>,
    /// Ordered email sequence. The runner walks these one after another.
    pub steps: Vec<Step>,
    pub ab_test: Option<AbTest>,
    pub schedule: ScheduleSettings,
    pub follow_up_rules: Vec<FollowUpRule>,
    pub tracking: TrackingSettings,
    pub metrics: CampaignMetrics,
    /// Percentage of the sequence delivered (0-100).
    pub progress: u8,
    pub lead_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Whether the runner should rotate A/B variants for this campaign.
    pub fn ab_testing_enabled(&self) -> bool {
        self.ab_test.as_ref().is_some_and(|t| t.enabled)
    }
}

/// Campaign lifecycle states.
///
/// - Draft: created in the wizard, never launched
/// - Active: the runner is sending batches
/// - Paused: runner stopped by the user, resumable
/// - Completed: every step was sent to every lead
/// - Error: a batch failed outside per-lead sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Error,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Active => write!(f, "active"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(CampaignStatus::Draft),
            "active" => Ok(CampaignStatus::Active),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            "error" => Ok(CampaignStatus::Error),
            other => Err(format!("invalid campaign status: '{other}'")),
        }
    }
}

impl Default for CampaignStatus {
    fn default() -> Self {
        CampaignStatus::Draft
    }
}

/// Who the campaign emails come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub name: String,
    pub email: String,
}

/// One email in a campaign sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Step {
    /// Create a step with no variants.
    pub fn new(id: impl Into<String>, subject: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            content: content.into(),
            variants: Vec::new(),
        }
    }

    /// Add a variant seeded from this step's subject and content.
    pub fn add_variant(&mut self) -> &mut Variant {
        let index = self.variants.len();
        self.variants.push(Variant {
            id: (index + 1).to_string(),
            name: format!("Variant {}", variant_letter(index)),
            subject: self.subject.clone(),
            content: self.content.clone(),
        });
        &mut self.variants[index]
    }
}

/// Letter label for the n-th variant: A, B, C...
pub fn variant_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// An A/B alternative for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub content: String,
}

/// A/B test configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTest {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: AbTestKind,
    /// Percentage of recipients included in the test (10-100).
    #[serde(default = "default_split_ratio")]
    pub split_ratio: u8,
    #[serde(default = "default_test_duration")]
    pub test_duration_hours: u32,
    #[serde(default)]
    pub winning_criteria: WinningCriteria,
}

fn default_split_ratio() -> u8 {
    50
}

fn default_test_duration() -> u32 {
    24
}

impl Default for AbTest {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: AbTestKind::Subject,
            split_ratio: default_split_ratio(),
            test_duration_hours: default_test_duration(),
            winning_criteria: WinningCriteria::Opens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbTestKind {
    Subject,
    Content,
    Sender,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinningCriteria {
    #[default]
    Opens,
    Clicks,
    Replies,
}

/// Delivery window and throttling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub time_zone: String,
    #[serde(default)]
    pub sending_speed: SendingSpeed,
    #[serde(default = "default_true")]
    pub optimize_delivery_time: bool,
    #[serde(default)]
    pub working_hours: WorkingHours,
}

impl ScheduleSettings {
    /// Maximum emails per day given the hourly rate and the working window.
    pub fn daily_limit(&self) -> u32 {
        let hours = self.working_hours.hours_per_day();
        (f64::from(self.sending_speed.emails_per_hour) * hours).floor() as u32
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            start_date: now,
            end_date: Some(now + chrono::Duration::days(7)),
            time_zone: "UTC".to_string(),
            sending_speed: SendingSpeed::default(),
            optimize_delivery_time: true,
            working_hours: WorkingHours::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendingSpeed {
    pub emails_per_hour: u32,
    pub batch_size: u32,
    pub delay_between_batches_minutes: u32,
}

impl Default for SendingSpeed {
    fn default() -> Self {
        Self {
            emails_per_hour: 50,
            batch_size: 10,
            delay_between_batches_minutes: 5,
        }
    }
}

/// Daily sending window, `HH:MM` strings plus weekday numbers (0 = Sunday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
    pub days: Vec<u8>,
}

impl WorkingHours {
    /// Length of the window in hours. Unparseable or inverted windows yield 0.
    pub fn hours_per_day(&self) -> f64 {
        let parse = |s: &str| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok();
        match (parse(&self.start), parse(&self.end)) {
            (Some(start), Some(end)) if end > start => {
                (end - start).num_minutes() as f64 / 60.0
            }
            _ => 0.0,
        }
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "17:00".to_string(),
            days: vec![1, 2, 3, 4, 5],
        }
    }
}

/// Automation rule sending a follow-up based on recipient behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpRule {
    pub id: String,
    pub name: String,
    pub trigger: FollowUpTrigger,
    pub action: FollowUpAction,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTrigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    pub delay: u32,
    #[serde(default)]
    pub delay_unit: DelayUnit,
}

impl FollowUpTrigger {
    /// Delay expressed as a chrono duration.
    pub fn delay_duration(&self) -> chrono::Duration {
        let delay = i64::from(self.delay);
        match self.delay_unit {
            DelayUnit::Minutes => chrono::Duration::minutes(delay),
            DelayUnit::Hours => chrono::Duration::hours(delay),
            DelayUnit::Days => chrono::Duration::days(delay),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    NoReply,
    Opened,
    Clicked,
    NotOpened,
    Replied,
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "no_reply" | "no_response" => Ok(TriggerKind::NoReply),
            "opened" => Ok(TriggerKind::Opened),
            "clicked" => Ok(TriggerKind::Clicked),
            "not_opened" => Ok(TriggerKind::NotOpened),
            "replied" => Ok(TriggerKind::Replied),
            other => Err(format!("invalid trigger type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    Hours,
    #[default]
    Days,
}

impl FromStr for DelayUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('s') {
            "minute" => Ok(DelayUnit::Minutes),
            "hour" => Ok(DelayUnit::Hours),
            "day" => Ok(DelayUnit::Days),
            other => Err(format!("invalid delay unit: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FollowUpAction {
    SendEmail { subject: String, content: String },
    MoveToSegment { segment: String },
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSettings {
    pub open_tracking: bool,
    pub click_tracking: bool,
    pub unsubscribe_tracking: bool,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            open_tracking: true,
            click_tracking: true,
            unsubscribe_tracking: true,
        }
    }
}

/// Delivery counters, refreshed by the runner after each batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub sent: i64,
    pub delivered: i64,
    pub opens: i64,
    pub clicks: i64,
    pub replies: i64,
    pub bounces: i64,
    pub unsubscribes: i64,
    pub complaints: i64,
    pub opportunities: i64,
}

/// Request to create a campaign. Only `name` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub sender: Option<SenderProfile>,
    pub reply_to: Option<String>,
    pub steps: Option<Vec<Step>>,
    pub ab_test: Option<AbTest>,
    pub schedule: Option<ScheduleSettings>,
    pub follow_up_rules: Option<Vec<FollowUpRule>>,
    pub tracking: Option<TrackingSettings>,
}

/// Partial update of a campaign. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub status: Option<CampaignStatus>,
    pub sender: Option<SenderProfile>,
    pub reply_to: Option<String>,
    pub steps: Option<Vec<Step>>,
    pub ab_test: Option<AbTest>,
    pub schedule: Option<ScheduleSettings>,
    pub follow_up_rules: Option<Vec<FollowUpRule>>,
    pub tracking: Option<TrackingSettings>,
}

/// Aggregate figures shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_campaigns: i64,
    pub active_campaigns: i64,
    pub total_leads: i64,
    pub total_sent: i64,
    pub total_replies: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_roundtrip() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Active,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
            CampaignStatus::Error,
        ] {
            let parsed: CampaignStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_campaign_status_rejects_unknown() {
        let err = "running".parse::<CampaignStatus>().unwrap_err();
        assert!(err.contains("running"));
    }

    #[test]
    fn test_daily_limit_default_window() {
        let schedule = ScheduleSettings::default();
        // 50/hour across 09:00-17:00
        assert_eq!(schedule.daily_limit(), 400);
    }

    #[test]
    fn test_daily_limit_partial_hours() {
        let mut schedule = ScheduleSettings::default();
        schedule.sending_speed.emails_per_hour = 15;
        schedule.working_hours.start = "09:30".to_string();
        schedule.working_hours.end = "11:00".to_string();
        assert_eq!(schedule.daily_limit(), 22);
    }

    #[test]
    fn test_daily_limit_inverted_window_is_zero() {
        let mut schedule = ScheduleSettings::default();
        schedule.working_hours.start = "18:00".to_string();
        schedule.working_hours.end = "08:00".to_string();
        assert_eq!(schedule.daily_limit(), 0);
    }

    #[test]
    fn test_add_variant_copies_step() {
        let mut step = Step::new("1", "Hi {{firstName}}", "Body");
        step.add_variant();
        let second = step.add_variant();
        assert_eq!(second.id, "2");
        assert_eq!(second.name, "Variant B");
        assert_eq!(second.subject, "Hi {{firstName}}");
    }

    #[test]
    fn test_follow_up_rule_json_shape() {
        let json = r#"{
            "id": "1",
            "name": "First Follow-up",
            "trigger": { "type": "no_reply", "delay": 3, "delay_unit": "days" },
            "action": { "type": "send_email", "subject": "Re: hi", "content": "Bump" }
        }"#;
        let rule: FollowUpRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.trigger.kind, TriggerKind::NoReply);
        assert_eq!(rule.trigger.delay_duration(), chrono::Duration::days(3));
        assert!(matches!(rule.action, FollowUpAction::SendEmail { .. }));
    }

    #[test]
    fn test_trigger_kind_accepts_wizard_alias() {
        assert_eq!("no_response".parse::<TriggerKind>().unwrap(), TriggerKind::NoReply);
        assert_eq!("not-opened".parse::<TriggerKind>().unwrap(), TriggerKind::NotOpened);
    }

    #[test]
    fn test_delay_unit_parse() {
        assert_eq!("hours".parse::<DelayUnit>().unwrap(), DelayUnit::Hours);
        assert_eq!("Day".parse::<DelayUnit>().unwrap(), DelayUnit::Days);
        assert!("weeks".parse::<DelayUnit>().is_err());
    }

    #[test]
    fn test_ab_test_defaults_when_missing() {
        let json = r#"{ "enabled": true, "type": "content" }"#;
        let ab: AbTest = serde_json::from_str(json).unwrap();
        assert_eq!(ab.split_ratio, 50);
        assert_eq!(ab.test_duration_hours, 24);
        assert_eq!(ab.winning_criteria, WinningCriteria::Opens);
    }
}
