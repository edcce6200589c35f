//! One-off send command.

use anyhow::Result;
use console::style;

use outreach_types::mail::{MailAccountId, OutboundEmail};

use super::parse_id;
use crate::state::AppState;

pub async fn send_email(
    state: &AppState,
    email: OutboundEmail,
    account: Option<String>,
    json: bool,
) -> Result<()> {
    if email.html.is_none() && email.text.is_none() {
        anyhow::bail!("give a body with --html or --text");
    }

    let receipt = match account {
        Some(raw) => {
            let id: MailAccountId = parse_id(&raw, "mail account")?;
            let transport = state.account_service.transport_for(&id).await?;
            transport.send(&email).await?
        }
        None => state.mailer.send(&email).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        println!(
            "  {} Sent to {} via {} {}",
            style("✓").green().bold(),
            style(&email.to).cyan(),
            receipt.transport,
            style(&receipt.message_id).dim()
        );
    }
    Ok(())
}
