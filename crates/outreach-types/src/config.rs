//! Global configuration types for Outreach.
//!
//! `GlobalConfig` represents the top-level `config.toml` in the data
//! directory: HTTP server, campaign runner and mail transport settings.

use serde::{Deserialize, Serialize};

use crate::mail::default_smtp_port;

/// Top-level configuration.
///
/// Loaded from `~/.outreach/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

/// HTTP server settings for `outreach serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Campaign runner pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Leads sent per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Seconds between ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Fraction of replies counted as opportunities.
    #[serde(default = "default_opportunity_rate")]
    pub opportunity_rate: f64,
}

fn default_batch_size() -> usize {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_opportunity_rate() -> f64 {
    0.3
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_secs: default_interval_secs(),
            opportunity_rate: default_opportunity_rate(),
        }
    }
}

/// Which provider carries outbound mail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Smtp,
    Mailgun,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Smtp => write!(f, "smtp"),
            TransportKind::Mailgun => write!(f, "mailgun"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smtp" => Ok(TransportKind::Smtp),
            "mailgun" => Ok(TransportKind::Mailgun),
            other => Err(format!("unknown mail transport '{other}'")),
        }
    }
}

/// Default mail transport. Passwords and API keys live here only until the
/// infra layer wraps them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender used when a message has no explicit `from`.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub mailgun: MailgunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            secure: false,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailgunConfig {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// API base; the EU region uses `https://api.eu.mailgun.net`.
    #[serde(default = "default_mailgun_base_url")]
    pub base_url: String,
}

fn default_mailgun_base_url() -> String {
    "https://api.mailgun.net".to_string()
}

impl Default for MailgunConfig {
    fn default() -> Self {
        Self {
            domain: None,
            api_key: None,
            base_url: default_mailgun_base_url(),
        }
    }
}
