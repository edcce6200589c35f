//! Mail accounts, outbound messages and delivery statistics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a configured mail account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailAccountId(pub Uuid);

impl MailAccountId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MailAccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MailAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MailAccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An SMTP (and optionally IMAP) account used to send campaign mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAccount {
    pub id: MailAccountId,
    pub account_name: String,
    pub smtp: SmtpSettings,
    pub imap: Option<ImapSettings>,
    pub from_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MailAccount {
    /// Copy with every password replaced by a mask, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.smtp.password = mask(&copy.smtp.password);
        if let Some(imap) = copy.imap.as_mut() {
            imap.password = mask(&imap.password);
        }
        copy
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

/// SMTP connection settings.
///
/// `secure = true` means implicit TLS (usually port 465); otherwise
/// STARTTLS is negotiated on the given port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub fn default_smtp_port() -> u16 {
    587
}

/// IMAP settings, stored for reply tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Request to create or replace a mail account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMailAccountRequest {
    pub account_name: String,
    pub smtp: SmtpSettings,
    pub imap: Option<ImapSettings>,
    pub from_email: String,
}

/// A single message handed to a mail transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    /// Overrides the transport's default sender when present.
    pub from: Option<String>,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    pub reply_to: Option<String>,
    /// Extra headers (e.g. `X-Campaign-Id`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Provider-side tags for event filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Template variables passed to providers that render server-side.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl OutboundEmail {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// What a transport reports back after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub transport: String,
}

/// Provider-side delivery counters for one campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub delivered: i64,
    pub opened: i64,
    pub clicked: i64,
    pub replied: i64,
    pub bounced: i64,
    pub unsubscribed: i64,
}

/// Header carrying the campaign id on every campaign message.
pub const CAMPAIGN_HEADER: &str = "X-Campaign-Id";
pub const STEP_HEADER: &str = "X-Step-Id";
pub const VARIANT_HEADER: &str = "X-Variant-Id";

/// Render `name <email>` for an address header. A display name holding
/// address specials (a comma, say) is quoted; a blank name yields the bare
/// address.
pub fn format_mailbox(name: &str, email: &str) -> String {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() {
        return email.to_string();
    }
    if name.chars().any(|c| "()<>[]:;@\\,.\"".contains(c)) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\" <{email}>")
    } else {
        format!("{name} <{email}>")
    }
}
