//! Lead CLI commands: import, list, add, delete.

use std::path::Path;

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use outreach_core::import::resolve_mapping;
use outreach_core::repository::lead::LeadFilter;
use outreach_infra::import::parse_file;
use outreach_types::campaign::CampaignId;
use outreach_types::lead::{CreateLeadRequest, LeadId, is_plausible_email, normalize_email};

use super::parse_id;
use crate::state::AppState;

/// Import a CSV/XLSX file.
///
/// # Examples
///
/// ```bash
/// outreach lead import leads.csv
/// outreach lead import export.xlsx --map email="E-mail Address" --map company=Org
/// ```
pub async fn import_leads(
    state: &AppState,
    file: &Path,
    assignments: &[String],
    no_detect: bool,
    campaign: Option<String>,
    json: bool,
) -> Result<()> {
    let campaign: Option<CampaignId> = match campaign {
        Some(raw) => Some(parse_id(&raw, "campaign")?),
        None => None,
    };

    let spinner = ProgressBar::new_spinner();
    if json {
        spinner.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Reading {}...", file.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let sheet = match parse_file(file).await {
        Ok(sheet) => sheet,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    let mapping = resolve_mapping(&sheet.columns, assignments, !no_detect)?;

    spinner.set_message(format!("Importing {} rows...", sheet.rows.len()));
    let result = state
        .lead_service
        .import_sheet(&sheet, &mapping, campaign.as_ref())
        .await;
    spinner.finish_and_clear();
    let summary = result?;

    if json {
        let out = serde_json::json!({
            "mapping": mapping,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("── Column mapping ──").dim());
    for (field, column) in &mapping.fields {
        println!("  {:<12} ← {}", field.to_string(), style(column).cyan());
    }
    println!();
    println!("  {} {}", style("✓").green().bold(), summary);

    if !summary.errors.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Row").fg(Color::White),
            Cell::new("Problem").fg(Color::White),
        ]);
        for issue in summary.errors.iter().take(20) {
            table.add_row(vec![
                Cell::new(issue.row).fg(Color::Yellow),
                Cell::new(&issue.reason),
            ]);
        }
        println!();
        println!("{table}");
        if summary.errors.len() > 20 {
            println!("  {}", style(format!("... and {} more", summary.errors.len() - 20)).dim());
        }
    }
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn list_leads(
    state: &AppState,
    industry: Option<String>,
    region: Option<String>,
    tag: Option<String>,
    search: Option<String>,
    limit: i64,
    offset: i64,
    json: bool,
) -> Result<()> {
    let filter = LeadFilter {
        industry,
        region,
        tag,
        search,
        limit: Some(limit),
        offset: Some(offset),
        ..Default::default()
    };
    let leads = state.lead_service.list_leads(Some(filter)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&leads)?);
        return Ok(());
    }

    if leads.is_empty() {
        println!();
        println!(
            "  {} No leads found. Import some with: {}",
            style("i").blue().bold(),
            style("outreach lead import <file>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Email").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Company").fg(Color::White),
        Cell::new("Industry").fg(Color::White),
        Cell::new("Tags").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);
    for lead in &leads {
        table.add_row(vec![
            Cell::new(&lead.email).fg(Color::Cyan),
            Cell::new(lead.display_name()),
            Cell::new(lead.company.as_deref().unwrap_or("")),
            Cell::new(lead.industry.as_deref().unwrap_or("")),
            Cell::new(lead.tags.join(", ")),
            Cell::new(lead.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    let total = state.lead_service.count_leads().await?;
    println!();
    println!("{table}");
    println!(
        "  {}",
        style(format!("showing {} of {total}", leads.len())).dim()
    );
    println!();
    Ok(())
}

pub async fn add_lead(state: &AppState, request: CreateLeadRequest, json: bool) -> Result<()> {
    let lead = state.lead_service.add_lead(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lead)?);
    } else {
        println!(
            "  {} Added {} {}",
            style("✓").green().bold(),
            style(&lead.email).cyan(),
            style(lead.id.to_string()).dim()
        );
    }
    Ok(())
}

pub async fn delete_leads(state: &AppState, ids: &[String], force: bool, json: bool) -> Result<()> {
    let ids = ids
        .iter()
        .map(|raw| parse_id::<LeadId>(raw, "lead"))
        .collect::<Result<Vec<_>>>()?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} lead(s)?", ids.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = if let [id] = ids.as_slice() {
        state.lead_service.delete_lead(id).await?;
        1
    } else {
        state.lead_service.delete_leads(&ids).await?
    };

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        println!("  {} Deleted {deleted} lead(s)", style("✓").green().bold());
    }
    Ok(())
}

/// Add `email` to (or, with `subscribed`, take it off) the transport's
/// suppression list.
pub async fn set_subscription(
    state: &AppState,
    email: &str,
    subscribed: bool,
    json: bool,
) -> Result<()> {
    let email = normalize_email(email);
    if !is_plausible_email(&email) {
        bail!("'{email}' is not a valid email address");
    }

    if subscribed {
        state.mailer.resubscribe(&email).await?;
    } else {
        state.mailer.unsubscribe(&email).await?;
    }

    if json {
        println!(
            "{}",
            serde_json::json!({ "email": email, "subscribed": subscribed })
        );
    } else if subscribed {
        println!("  {} {email} can receive mail again", style("✓").green().bold());
    } else {
        println!("  {} {email} unsubscribed", style("✓").green().bold());
    }
    Ok(())
}
