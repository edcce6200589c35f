//! CLI command definitions and dispatch for the `outreach` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a
//! noun-verb pattern (e.g., `outreach campaign create`, `outreach lead import`).

pub mod account;
pub mod campaign;
pub mod lead;
pub mod send;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run outreach campaigns from the terminal.
#[derive(Parser)]
#[command(name = "outreach", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, edit and run campaigns.
    Campaign {
        #[command(subcommand)]
        action: CampaignCommand,
    },

    /// Import and manage leads.
    Lead {
        #[command(subcommand)]
        action: LeadCommand,
    },

    /// Manage SMTP mail accounts.
    Account {
        #[command(subcommand)]
        action: AccountCommand,
    },

    /// Send a single email through the configured transport.
    Send {
        /// Recipient address.
        #[arg(long)]
        to: String,

        #[arg(long)]
        subject: String,

        /// HTML body.
        #[arg(long)]
        html: Option<String>,

        /// Plain-text body.
        #[arg(long)]
        text: Option<String>,

        /// Send through a stored mail account instead of the default transport.
        #[arg(long)]
        account: Option<String>,
    },

    /// Dashboard totals and configuration overview.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to `PORT` or `[server] port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `[server] host`).
        #[arg(long)]
        host: Option<String>,

        /// Export spans to stdout through OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CampaignCommand {
    /// Create a draft campaign.
    Create {
        /// Campaign name (prompted if omitted).
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        sender_name: Option<String>,

        #[arg(long)]
        sender_email: Option<String>,

        #[arg(long)]
        reply_to: Option<String>,
    },

    /// List campaigns.
    #[command(alias = "ls")]
    List {
        /// Filter by status (draft, active, paused, completed, error).
        #[arg(long)]
        status: Option<String>,
    },

    /// Show a campaign with its steps and recipients.
    Show { id: String },

    /// Change a campaign's basics.
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        sender_name: Option<String>,

        #[arg(long)]
        sender_email: Option<String>,

        #[arg(long)]
        reply_to: Option<String>,
    },

    /// Delete a campaign (its leads are kept).
    #[command(alias = "rm")]
    Delete {
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Append an email step to the sequence.
    AddStep {
        id: String,

        #[arg(long)]
        subject: String,

        /// Body; `{{firstName}}`-style placeholders are filled per lead.
        #[arg(long)]
        content: String,
    },

    /// Review a campaign and, once confirmed, run it.
    Launch {
        id: String,

        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },

    /// Send a campaign in the foreground until it completes.
    Run { id: String },

    /// Mark a campaign paused.
    Pause { id: String },

    /// Mark a paused campaign active again.
    Resume { id: String },
}

#[derive(Subcommand)]
pub enum LeadCommand {
    /// Import leads from a CSV or XLSX file.
    Import {
        file: PathBuf,

        /// Column mapping override, `field=Column Header` (repeatable).
        #[arg(long = "map", value_name = "FIELD=COLUMN")]
        mappings: Vec<String>,

        /// Only use the given --map entries, without header auto-detection.
        #[arg(long)]
        no_detect: bool,

        /// Attach the imported leads to this campaign.
        #[arg(long)]
        campaign: Option<String>,
    },

    /// List leads.
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        industry: Option<String>,

        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Match email, name or company.
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value = "50")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Add a single lead.
    Add {
        #[arg(long)]
        email: String,

        /// Full name, split into first and last.
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        job_title: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        industry: Option<String>,

        #[arg(long)]
        region: Option<String>,

        /// Tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Delete one or more leads.
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Stop all mail to an address through the provider's suppression list.
    Unsubscribe { email: String },

    /// Allow mail to a previously unsubscribed address again.
    Resubscribe { email: String },
}

#[derive(Subcommand)]
pub enum AccountCommand {
    /// Add an SMTP account (prompts for anything not given).
    Add {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long, default_value = "587")]
        port: u16,

        /// Use implicit TLS (usually port 465).
        #[arg(long)]
        secure: bool,

        #[arg(long)]
        username: Option<String>,
    },

    /// List mail accounts (passwords masked).
    #[command(alias = "ls")]
    List,

    /// Delete a mail account.
    #[command(alias = "rm")]
    Delete {
        id: String,

        #[arg(long)]
        force: bool,
    },

    /// Connect and authenticate without sending.
    Test { id: String },
}

/// Parse a UUID-backed id argument with a readable error.
pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("'{raw}' is not a valid {what} id"))
}
