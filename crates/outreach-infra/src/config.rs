//! Global configuration loader for Outreach.
//!
//! Reads `config.toml` from the data directory (`~/.outreach/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::Path;

use outreach_types::config::{GlobalConfig, TransportKind};

use crate::filesystem::config_path;

/// Load global configuration from `{data_dir}/config.toml`, with
/// environment variables taking precedence.
///
/// - If the file does not exist, starts from [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and uses the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let mut config = read_config_file(data_dir).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(data_dir: &Path) -> GlobalConfig {
    let config_path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Overlay the server's environment variables onto `config`.
///
/// `lookup` returns the value of a variable, if set. Empty values are
/// treated as unset; unparsable numbers are ignored with a warning.
pub fn apply_env_overrides(config: &mut GlobalConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get("PORT") {
        match port.trim().parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid PORT"),
        }
    }

    if let Some(host) = get("SMTP_HOST") {
        config.mail.smtp.host = Some(host);
    }
    if let Some(port) = get("SMTP_PORT") {
        match port.trim().parse() {
            Ok(port) => config.mail.smtp.port = port,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid SMTP_PORT"),
        }
    }
    if let Some(secure) = get("SMTP_SECURE") {
        config.mail.smtp.secure = secure == "true";
    }
    if let Some(user) = get("SMTP_USER") {
        config.mail.smtp.username = Some(user);
    }
    if let Some(pass) = get("SMTP_PASS") {
        config.mail.smtp.password = Some(pass);
    }

    if let Some(key) = get("MAILGUN_API_KEY") {
        config.mail.mailgun.api_key = Some(key);
    }
    if let Some(domain) = get("MAILGUN_DOMAIN") {
        config.mail.mailgun.domain = Some(domain);
    }
    if let Some(kind) = get("MAIL_TRANSPORT") {
        match kind.parse::<TransportKind>() {
            Ok(kind) => config.mail.transport = kind,
            Err(e) => tracing::warn!("ignoring MAIL_TRANSPORT: {e}"),
        }
    }

    // SMTP_FROM is the SMTP server's sender; MAIL_FROM is Mailgun's.
    let from_key = match config.mail.transport {
        TransportKind::Smtp => ["SMTP_FROM", "MAIL_FROM"],
        TransportKind::Mailgun => ["MAIL_FROM", "SMTP_FROM"],
    };
    if let Some(from) = from_key.iter().find_map(|key| get(*key)) {
        config.mail.from = Some(from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[tokio::test]
    async fn read_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn read_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 8080

[runner]
batch_size = 25
interval_secs = 30

[mail]
transport = "mailgun"
from = "Sales <sales@corp.io>"

[mail.mailgun]
domain = "mg.corp.io"
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.runner.batch_size, 25);
        assert_eq!(config.runner.interval_secs, 30);
        assert_eq!(config.mail.transport, TransportKind::Mailgun);
        assert_eq!(config.mail.mailgun.domain.as_deref(), Some("mg.corp.io"));
        assert_eq!(config.mail.mailgun.base_url, "https://api.mailgun.net");
    }

    #[tokio::test]
    async fn read_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = read_config_file(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn env_overrides_smtp_settings() {
        let mut config = GlobalConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "4000"),
                ("SMTP_HOST", "mx.corp.io"),
                ("SMTP_PORT", "465"),
                ("SMTP_SECURE", "true"),
                ("SMTP_USER", "bot"),
                ("SMTP_PASS", "hunter2"),
                ("SMTP_FROM", "bot@corp.io"),
                ("MAIL_FROM", "other@corp.io"),
            ]),
        );

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.mail.smtp.host.as_deref(), Some("mx.corp.io"));
        assert_eq!(config.mail.smtp.port, 465);
        assert!(config.mail.smtp.secure);
        assert_eq!(config.mail.smtp.username.as_deref(), Some("bot"));
        assert_eq!(config.mail.smtp.password.as_deref(), Some("hunter2"));
        assert_eq!(config.mail.from.as_deref(), Some("bot@corp.io"));
    }

    #[test]
    fn env_overrides_mailgun_prefers_mail_from() {
        let mut config = GlobalConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("MAIL_TRANSPORT", "mailgun"),
                ("MAILGUN_API_KEY", "key-1"),
                ("MAILGUN_DOMAIN", "mg.corp.io"),
                ("SMTP_FROM", "smtp@corp.io"),
                ("MAIL_FROM", "mg@corp.io"),
            ]),
        );

        assert_eq!(config.mail.transport, TransportKind::Mailgun);
        assert_eq!(config.mail.mailgun.api_key.as_deref(), Some("key-1"));
        assert_eq!(config.mail.from.as_deref(), Some("mg@corp.io"));
    }

    #[test]
    fn env_overrides_ignore_garbage_and_blanks() {
        let mut config = GlobalConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("PORT", "not-a-port"), ("SMTP_SECURE", "yes"), ("SMTP_HOST", "  ")]),
        );
        assert_eq!(config.server.port, 3000);
        assert!(!config.mail.smtp.secure);
        assert!(config.mail.smtp.host.is_none());
    }
}
