//! Campaign CLI commands: create, list, show, update, delete, add-step,
//! launch, run, pause, resume.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;

use outreach_core::repository::campaign::CampaignFilter;
use outreach_types::campaign::{
    Campaign, CampaignId, CampaignStatus, CreateCampaignRequest, SenderProfile,
    UpdateCampaignRequest,
};
use outreach_types::event::RunnerEvent;

use super::parse_id;
use crate::state::AppState;

/// Create a draft campaign, prompting for the name when not given.
pub async fn create_campaign(
    state: &AppState,
    name: Option<String>,
    sender_name: Option<String>,
    sender_email: Option<String>,
    reply_to: Option<String>,
    json: bool,
) -> Result<()> {
    let name = match name {
        Some(n) => n,
        None => Input::<String>::new()
            .with_prompt("Campaign name")
            .interact_text()?,
    };

    let sender = match (sender_name, sender_email) {
        (None, None) => None,
        (name, email) => Some(SenderProfile {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
        }),
    };

    let campaign = state
        .campaign_service
        .create_campaign(CreateCampaignRequest {
            name,
            sender,
            reply_to,
            ..Default::default()
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&campaign)?);
        return Ok(());
    }

    println!();
    println!("  {} Campaign created", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Name:").bold(), style(&campaign.name).cyan());
    println!("  {}    {}", style("ID:").bold(), style(campaign.id.to_string()).dim());
    println!();
    println!(
        "  Next: {}",
        style(format!(
            "outreach campaign add-step {} --subject ... --content ...",
            campaign.id
        ))
        .yellow()
    );
    println!();
    Ok(())
}

/// List campaigns in a table.
pub async fn list_campaigns(state: &AppState, status: Option<String>, json: bool) -> Result<()> {
    let status = match status {
        Some(s) => Some(s.parse::<CampaignStatus>().map_err(|e| anyhow::anyhow!(e))?),
        None => None,
    };
    let filter = CampaignFilter {
        status,
        ..Default::default()
    };
    let campaigns = state.campaign_service.list_campaigns(Some(filter)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&campaigns)?);
        return Ok(());
    }

    if campaigns.is_empty() {
        println!();
        println!(
            "  {} No campaigns found. Create one with: {}",
            style("i").blue().bold(),
            style("outreach campaign create").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Steps").fg(Color::White),
        Cell::new("Leads").fg(Color::White),
        Cell::new("Progress").fg(Color::White),
        Cell::new("Sent").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for campaign in &campaigns {
        table.add_row(vec![
            Cell::new(&campaign.name).fg(Color::Cyan),
            status_cell(&campaign.status),
            Cell::new(campaign.steps.len()),
            Cell::new(campaign.lead_count),
            Cell::new(format!("{}%", campaign.progress)),
            Cell::new(campaign.metrics.sent),
            Cell::new(campaign.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Show one campaign: basics, sequence and metrics.
pub async fn show_campaign(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let campaign = state.campaign_service.get_campaign(&id).await?;
    let progress = state.runner.progress(&id);

    if json {
        let out = serde_json::json!({
            "campaign": campaign,
            "runner": progress,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_campaign(&campaign);
    Ok(())
}

fn print_campaign(campaign: &Campaign) {
    println!();
    println!(
        "  {} {}",
        style(&campaign.name).cyan().bold(),
        style(format!("({})", campaign.status)).dim()
    );
    println!("  {}", style(campaign.id.to_string()).dim());
    println!();

    let sender = if campaign.sender.email.is_empty() {
        style("default sender".to_string()).dim().to_string()
    } else {
        format!("{} <{}>", campaign.sender.name, campaign.sender.email)
    };
    println!("  {}    {}", style("From:").bold(), sender);
    if let Some(reply_to) = &campaign.reply_to {
        println!("  {} {}", style("Reply-To:").bold(), reply_to);
    }
    println!("  {}   {}", style("Leads:").bold(), campaign.lead_count);
    println!(
        "  {} {} emails/day",
        style("Daily cap:").bold(),
        campaign.schedule.daily_limit()
    );
    println!();

    println!("  {}", style("── Sequence ──").dim());
    if campaign.steps.is_empty() {
        println!("  {}", style("no steps yet").dim());
    }
    for (index, step) in campaign.steps.iter().enumerate() {
        println!(
            "  {}. {}",
            index + 1,
            style(&step.subject).bold()
        );
        for variant in &step.variants {
            println!("     {} {}: {}", style("↳").dim(), variant.name, variant.subject);
        }
    }
    println!();

    let m = &campaign.metrics;
    println!("  {}", style("── Metrics ──").dim());
    println!("  Progress:  {}%", style(campaign.progress).bold());
    println!("  Sent:      {}", m.sent);
    println!("  Opens:     {}", m.opens);
    println!("  Clicks:    {}", m.clicks);
    println!("  Replies:   {}", m.replies);
    println!("  Bounces:   {}", m.bounces);
    println!();
}

/// Apply a partial update from flags.
#[allow(clippy::too_many_arguments)]
pub async fn update_campaign(
    state: &AppState,
    id: &str,
    name: Option<String>,
    status: Option<String>,
    sender_name: Option<String>,
    sender_email: Option<String>,
    reply_to: Option<String>,
    json: bool,
) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let status = match status {
        Some(s) => Some(s.parse::<CampaignStatus>().map_err(|e| anyhow::anyhow!(e))?),
        None => None,
    };

    let sender = if sender_name.is_some() || sender_email.is_some() {
        let current = state.campaign_service.get_campaign(&id).await?.sender;
        Some(SenderProfile {
            name: sender_name.unwrap_or(current.name),
            email: sender_email.unwrap_or(current.email),
        })
    } else {
        None
    };

    let campaign = state
        .campaign_service
        .update_campaign(
            &id,
            UpdateCampaignRequest {
                name,
                status,
                sender,
                reply_to,
                ..Default::default()
            },
        )
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&campaign)?);
    } else {
        println!("  {} Campaign '{}' updated", style("✓").green().bold(), campaign.name);
    }
    Ok(())
}

/// Delete a campaign after confirmation.
pub async fn delete_campaign(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let campaign = state.campaign_service.get_campaign(&id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete campaign '{}'?", campaign.name))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.runner.stop(&id);
    state.campaign_service.delete_campaign(&id).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id}));
    } else {
        println!("  {} Deleted '{}'", style("✓").green().bold(), campaign.name);
    }
    Ok(())
}

pub async fn add_step(
    state: &AppState,
    id: &str,
    subject: &str,
    content: &str,
    json: bool,
) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let campaign = state.campaign_service.add_step(&id, subject, content).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&campaign)?);
    } else {
        println!(
            "  {} Step {} added to '{}'",
            style("✓").green().bold(),
            campaign.steps.len(),
            campaign.name
        );
    }
    Ok(())
}

/// Print the launch review, confirm, then run in the foreground.
pub async fn launch_campaign(state: &AppState, id: &str, yes: bool, json: bool) -> Result<()> {
    let campaign_id: CampaignId = parse_id(id, "campaign")?;
    let campaign = state.campaign_service.check_launchable(&campaign_id).await?;

    if !json {
        print_campaign(&campaign);
        println!(
            "  {} Ready to send {} step(s) to {} lead(s) via {}",
            style("✓").green().bold(),
            campaign.steps.len(),
            campaign.lead_count,
            style(state.runner.transport_name()).cyan()
        );
        println!();
    }

    if !yes && !json {
        let confirmed = Confirm::new()
            .with_prompt("Launch now?")
            .default(true)
            .interact()?;
        if !confirmed {
            println!("  Not launched.");
            return Ok(());
        }
    }

    run_campaign(state, id, json).await
}

/// Start the campaign and follow runner events until it finishes.
///
/// Ctrl+C pauses the campaign before exiting.
pub async fn run_campaign(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let mut events = state.runner.events().subscribe();
    state.runner.start(&id).await?;

    let bar = ProgressBar::new(100);
    if json {
        bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    bar.set_style(
        ProgressStyle::with_template("  {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(format!(
        "next batch in {}s",
        state.runner.settings().interval.as_secs()
    ));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                state.runner.pause(&id).await?;
                bar.abandon_with_message("paused");
                if json {
                    println!("{}", serde_json::to_string_pretty(&state.runner.progress(&id))?);
                }
                return Ok(());
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "runner events lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if event.campaign_id() != &id {
                    continue;
                }
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                }
                match event {
                    RunnerEvent::BatchSent { sent, failed, progress, .. } => {
                        bar.set_position(u64::from(progress));
                        bar.set_message(format!("batch: {sent} sent, {failed} failed"));
                    }
                    RunnerEvent::StepAdvanced { step_index, .. } => {
                        bar.set_message(format!("step {}", step_index + 1));
                    }
                    RunnerEvent::Completed { sent, failed, .. } => {
                        bar.set_position(100);
                        bar.finish_with_message(format!("done: {sent} sent, {failed} failed"));
                        break;
                    }
                    RunnerEvent::Failed { error, .. } => {
                        bar.abandon_with_message("failed");
                        anyhow::bail!("campaign failed: {error}");
                    }
                    RunnerEvent::Stopped { .. } => break,
                    _ => {}
                }
            }
        }
    }

    state.runner.stop(&id);
    Ok(())
}

/// Mark a campaign paused in storage.
///
/// Runs owned by `outreach serve` are paused live through
/// `POST /api/v1/campaigns/{id}/pause`.
pub async fn pause_campaign(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let campaign = state.campaign_service.get_campaign(&id).await?;
    if campaign.status != CampaignStatus::Active {
        anyhow::bail!("campaign is {}, not active", campaign.status);
    }
    let campaign = state
        .campaign_service
        .set_status(&id, CampaignStatus::Paused)
        .await?;
    report_status(&campaign, json)
}

pub async fn resume_campaign(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id: CampaignId = parse_id(id, "campaign")?;
    let campaign = state.campaign_service.get_campaign(&id).await?;
    if campaign.status != CampaignStatus::Paused {
        anyhow::bail!("campaign is {}, not paused", campaign.status);
    }
    let campaign = state
        .campaign_service
        .set_status(&id, CampaignStatus::Active)
        .await?;
    report_status(&campaign, json)
}

fn report_status(campaign: &Campaign, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(campaign)?);
    } else {
        println!(
            "  {} '{}' is now {}",
            style("✓").green().bold(),
            campaign.name,
            campaign.status
        );
    }
    Ok(())
}

/// Colored table cell for a campaign status.
pub fn status_cell(status: &CampaignStatus) -> Cell {
    match status {
        CampaignStatus::Draft => Cell::new("◌ draft").fg(Color::DarkGrey),
        CampaignStatus::Active => Cell::new("● active").fg(Color::Green),
        CampaignStatus::Paused => Cell::new("○ paused").fg(Color::Yellow),
        CampaignStatus::Completed => Cell::new("✓ completed").fg(Color::Blue),
        CampaignStatus::Error => Cell::new("✗ error").fg(Color::Red),
    }
}
