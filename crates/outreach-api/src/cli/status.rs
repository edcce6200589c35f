//! System status dashboard command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display dashboard totals, mail setup and where data lives.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let summary = state.campaign_service.dashboard().await?;
    let accounts = state.account_service.list_accounts().await?.len();
    let transport = state.mailer.name().to_string();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "dashboard": summary,
            "mail": {
                "transport": transport,
                "accounts": accounts,
            },
            "runner": {
                "batch_size": state.runner.settings().batch_size,
                "interval_secs": state.runner.settings().interval.as_secs(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Outreach v{}",
        style("✉").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Campaigns ──").dim());
    println!("  Total:    {}", style(summary.total_campaigns).bold());
    println!("  Active:   {}", style(summary.active_campaigns).green());
    println!("  Sent:     {}", summary.total_sent);
    println!("  Replies:  {}", summary.total_replies);
    println!();

    println!("  {}", style("── Leads ──").dim());
    println!("  Total:    {}", style(summary.total_leads).bold());
    println!();

    println!("  {}", style("── Mail ──").dim());
    let transport = if transport == "unconfigured" {
        style(transport).red().to_string()
    } else {
        style(transport).cyan().to_string()
    };
    println!("  Transport: {transport}");
    println!("  Accounts:  {accounts}");
    println!(
        "  Batches:   {} every {}s",
        state.runner.settings().batch_size,
        state.runner.settings().interval.as_secs()
    );
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!();

    Ok(())
}
