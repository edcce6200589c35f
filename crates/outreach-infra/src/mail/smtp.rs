//! SmtpTransport -- [`MailTransport`] over plain SMTP, using lettre.
//!
//! `secure = true` wraps the connection in TLS from the start (port 465);
//! otherwise STARTTLS is used when the server offers it. The password is
//! held as a [`SecretString`] and only exposed when building credentials.
//!
//! SMTP has no delivery feedback, so campaign stats come from local
//! counters of accepted messages.

use std::sync::Arc;

use dashmap::DashMap;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};

use outreach_core::mail::{BoxMailTransport, MailTransport, TransportFactory};
use outreach_types::campaign::{Campaign, CampaignId};
use outreach_types::config::MailConfig;
use outreach_types::error::MailError;
use outreach_types::mail::{
    CAMPAIGN_HEADER, DeliveryStats, MailAccount, OutboundEmail, SendReceipt, format_mailbox,
};

/// Connection settings for [`SmtpTransport`].
pub struct SmtpOptions {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Sender used when a message carries no `from`.
    pub default_from: Option<String>,
}

impl SmtpOptions {
    /// Options from the `[mail]` section of the global config.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let host = config
            .smtp
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| MailError::NotConfigured("SMTP host is not set".to_string()))?;

        Ok(Self {
            host,
            port: config.smtp.port,
            secure: config.smtp.secure,
            username: config.smtp.username.clone().filter(|u| !u.is_empty()),
            password: config.smtp.password.clone().map(SecretString::from),
            default_from: config.from.clone(),
        })
    }

    /// Options for a stored mail account.
    pub fn from_account(account: &MailAccount) -> Self {
        let smtp = &account.smtp;
        Self {
            host: smtp.host.clone(),
            port: smtp.port,
            secure: smtp.secure,
            username: Some(smtp.username.clone()).filter(|u| !u.is_empty()),
            password: Some(SecretString::from(smtp.password.clone())),
            default_from: Some(format_mailbox(&account.account_name, &account.from_email)),
        }
    }
}

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    default_from: Option<String>,
    delivered: Arc<DashMap<String, i64>>,
}

impl SmtpTransport {
    /// Build the transport. No connection is made until the first send.
    pub fn new(options: SmtpOptions) -> Result<Self, MailError> {
        let tls_params = TlsParameters::new(options.host.clone())
            .map_err(|e| MailError::NotConfigured(format!("TLS setup failed: {e}")))?;
        let tls = if options.secure {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(options.host.clone())
                .port(options.port)
                .tls(tls);

        if let Some(username) = options.username {
            let password = options
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            builder = builder.credentials(Credentials::new(username, password));
        }

        tracing::debug!(host = %options.host, port = options.port, secure = options.secure, "SMTP transport configured");

        Ok(Self {
            mailer: builder.build(),
            host: options.host,
            default_from: options.default_from,
            delivered: Arc::new(DashMap::new()),
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, MailError> {
        let from = email
            .from
            .as_deref()
            .or(self.default_from.as_deref())
            .ok_or_else(|| MailError::NotConfigured("no sender address configured".to_string()))?;

        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .to(parse_mailbox(&email.to)?)
            .subject(email.subject.clone());

        if let Some(reply_to) = email.reply_to.as_deref() {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }

        for (name, value) in &email.headers {
            let name = HeaderName::new_from_ascii(name.clone())
                .map_err(|e| MailError::Message(format!("invalid header '{name}': {e}")))?;
            builder = builder.raw_header(HeaderValue::new(name, value.clone()));
        }

        let built = match (&email.html, &email.text) {
            (Some(html), Some(text)) => builder.multipart(MultiPart::alternative_plain_html(
                text.clone(),
                html.clone(),
            )),
            (Some(html), None) => builder.singlepart(SinglePart::html(html.clone())),
            (None, Some(text)) => builder.header(ContentType::TEXT_PLAIN).body(text.clone()),
            (None, None) => builder.header(ContentType::TEXT_PLAIN).body(String::new()),
        };

        built.map_err(|e| MailError::Message(e.to_string()))
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, MailError> {
    let raw = raw.trim();
    if let Ok(mailbox) = raw.parse::<Mailbox>() {
        return Ok(mailbox);
    }

    // `Name <addr>` where the name was left unquoted despite holding
    // specials, e.g. `Sales, EU <sales@corp.io>` straight from config.
    let invalid = || MailError::InvalidAddress(raw.to_string());
    let (name, rest) = raw.rsplit_once('<').ok_or_else(invalid)?;
    let address = rest
        .strip_suffix('>')
        .ok_or_else(invalid)?
        .trim()
        .parse::<Address>()
        .map_err(|_| invalid())?;
    let name = unquote(name.trim());
    Ok(Mailbox::new(Some(name).filter(|n| !n.is_empty()), address))
}

fn unquote(name: &str) -> String {
    match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => name.to_string(),
    }
}

impl MailTransport for SmtpTransport {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, MailError> {
        let message = self.build_message(email)?;
        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(str::to_string)
            .unwrap_or_default();

        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if let Some(campaign_id) = email.header(CAMPAIGN_HEADER) {
            *self.delivered.entry(campaign_id.to_string()).or_insert(0) += 1;
        }

        tracing::debug!(
            to = %email.to,
            host = %self.host,
            code = %response.code(),
            "SMTP message accepted"
        );

        Ok(SendReceipt {
            message_id,
            transport: "smtp".to_string(),
        })
    }

    async fn prepare_campaign(&self, _campaign: &Campaign) -> Result<(), MailError> {
        Ok(())
    }

    async fn campaign_stats(&self, campaign_id: &CampaignId) -> Result<DeliveryStats, MailError> {
        let delivered = self
            .delivered
            .get(&campaign_id.to_string())
            .map(|count| *count)
            .unwrap_or(0);
        Ok(DeliveryStats {
            delivered,
            ..Default::default()
        })
    }

    async fn verify(&self) -> Result<(), MailError> {
        match self.mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Transport(format!(
                "{} did not accept the connection",
                self.host
            ))),
            Err(e) => Err(MailError::Transport(e.to_string())),
        }
    }
}

/// Builds an [`SmtpTransport`] for each stored mail account.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn for_account(&self, account: &MailAccount) -> Result<BoxMailTransport, MailError> {
        let transport = SmtpTransport::new(SmtpOptions::from_account(account))?;
        Ok(BoxMailTransport::new(transport))
    }
}
