//! Mail account CLI commands: add, list, delete, test.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use outreach_types::mail::{MailAccountId, SaveMailAccountRequest, SmtpSettings};

use super::parse_id;
use crate::state::AppState;

/// Add an SMTP account. Missing values are prompted for; the password is
/// always prompted so it never lands in shell history.
#[allow(clippy::too_many_arguments)]
pub async fn add_account(
    state: &AppState,
    name: Option<String>,
    from: Option<String>,
    host: Option<String>,
    port: u16,
    secure: bool,
    username: Option<String>,
    json: bool,
) -> Result<()> {
    let account_name = match name {
        Some(n) => n,
        None => Input::<String>::new()
            .with_prompt("Account name")
            .interact_text()?,
    };
    let from_email = match from {
        Some(f) => f,
        None => Input::<String>::new()
            .with_prompt("From address")
            .interact_text()?,
    };
    let host = match host {
        Some(h) => h,
        None => Input::<String>::new()
            .with_prompt("SMTP host")
            .interact_text()?,
    };
    let username = match username {
        Some(u) => u,
        None => Input::<String>::new()
            .with_prompt("SMTP username")
            .default(from_email.clone())
            .interact_text()?,
    };
    let password = Password::new().with_prompt("SMTP password").interact()?;

    let account = state
        .account_service
        .save_account(
            None,
            SaveMailAccountRequest {
                account_name,
                smtp: SmtpSettings {
                    host,
                    port,
                    secure,
                    username,
                    password,
                },
                imap: None,
                from_email,
            },
        )
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account.redacted())?);
        return Ok(());
    }

    println!();
    println!("  {} Mail account saved", style("✓").green().bold());
    println!("  {}  {}", style("Name:").bold(), style(&account.account_name).cyan());
    println!("  {}    {}", style("ID:").bold(), style(account.id.to_string()).dim());
    println!();
    println!(
        "  Check it with: {}",
        style(format!("outreach account test {}", account.id)).yellow()
    );
    println!();
    Ok(())
}

pub async fn list_accounts(state: &AppState, json: bool) -> Result<()> {
    let accounts: Vec<_> = state
        .account_service
        .list_accounts()
        .await?
        .iter()
        .map(|a| a.redacted())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!();
        println!(
            "  {} No mail accounts. Add one with: {}",
            style("i").blue().bold(),
            style("outreach account add").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("From").fg(Color::White),
        Cell::new("SMTP").fg(Color::White),
        Cell::new("TLS").fg(Color::White),
        Cell::new("IMAP").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);
    for account in &accounts {
        table.add_row(vec![
            Cell::new(&account.account_name).fg(Color::Cyan),
            Cell::new(&account.from_email),
            Cell::new(format!("{}:{}", account.smtp.host, account.smtp.port)),
            Cell::new(if account.smtp.secure { "implicit" } else { "starttls" }),
            Cell::new(
                account
                    .imap
                    .as_ref()
                    .map(|i| format!("{}:{}", i.host, i.port))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(account.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

pub async fn delete_account(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id: MailAccountId = parse_id(id, "mail account")?;
    let account = state.account_service.get_account(&id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete mail account '{}'?", account.account_name))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.account_service.delete_account(&id).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id}));
    } else {
        println!(
            "  {} Deleted '{}'",
            style("✓").green().bold(),
            account.account_name
        );
    }
    Ok(())
}

/// Connect to the account's SMTP server and authenticate.
pub async fn test_account(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id: MailAccountId = parse_id(id, "mail account")?;
    let account = state.account_service.get_account(&id).await?;

    let spinner = ProgressBar::new_spinner();
    if json {
        spinner.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "Connecting to {}:{}...",
        account.smtp.host, account.smtp.port
    ));
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let result = state.account_service.test_connection(&id).await;
    spinner.finish_and_clear();

    if json {
        let out = match &result {
            Ok(()) => serde_json::json!({"ok": true}),
            Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match result {
        Ok(()) => {
            println!(
                "  {} {} accepted the connection",
                style("✓").green().bold(),
                account.smtp.host
            );
            Ok(())
        }
        Err(e) => {
            println!("  {} {}", style("✗").red().bold(), e);
            Err(e.into())
        }
    }
}
