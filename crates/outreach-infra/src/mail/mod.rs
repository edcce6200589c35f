//! Mail transport implementations: SMTP (lettre) and Mailgun (HTTP API).

pub mod mailgun;
pub mod smtp;
pub mod unconfigured;

use outreach_core::mail::BoxMailTransport;
use outreach_types::config::{MailConfig, TransportKind};
use outreach_types::error::MailError;

pub use mailgun::MailgunTransport;
pub use smtp::{SmtpOptions, SmtpTransport, SmtpTransportFactory};
pub use unconfigured::UnconfiguredTransport;

/// Build the default transport selected by `[mail] transport`.
pub fn build_transport(config: &MailConfig) -> Result<BoxMailTransport, MailError> {
    let transport = match config.transport {
        TransportKind::Smtp => BoxMailTransport::new(SmtpTransport::new(SmtpOptions::from_config(config)?)?),
        TransportKind::Mailgun => BoxMailTransport::new(MailgunTransport::from_config(config)?),
    };
    tracing::debug!(transport = transport.name(), "mail transport selected");
    Ok(transport)
}

/// Like [`build_transport`], but a missing or broken mail setup yields a
/// transport that fails every call instead of an error, so commands that
/// never send still work.
pub fn build_transport_or_unconfigured(config: &MailConfig) -> BoxMailTransport {
    match build_transport(config) {
        Ok(transport) => transport,
        Err(e) => {
            tracing::warn!("mail transport unavailable: {e}");
            BoxMailTransport::new(UnconfiguredTransport::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_transport_follows_kind() {
        let mut config = MailConfig::default();
        config.smtp.host = Some("mx.corp.io".to_string());
        assert_eq!(build_transport(&config).unwrap().name(), "smtp");

        config.transport = TransportKind::Mailgun;
        assert!(matches!(
            build_transport(&config),
            Err(MailError::NotConfigured(_))
        ));

        config.mailgun.api_key = Some("key".to_string());
        config.mailgun.domain = Some("mg.corp.io".to_string());
        assert_eq!(build_transport(&config).unwrap().name(), "mailgun");
    }

    #[tokio::test]
    async fn test_missing_setup_falls_back_to_failing_transport() {
        let transport = build_transport_or_unconfigured(&MailConfig::default());
        assert_eq!(transport.name(), "unconfigured");
        let err = transport.verify().await.unwrap_err();
        assert!(err.to_string().contains("SMTP host is not set"));
    }
}
