//! Outreach CLI and REST API entry point.
//!
//! Binary name: `outreach`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{AccountCommand, CampaignCommand, Cli, Commands, LeadCommand};
use outreach_types::lead::CreateLeadRequest;
use outreach_types::mail::OutboundEmail;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "outreach", &mut std::io::stdout());
        return Ok(());
    }

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    let filter = outreach_observe::verbosity_filter(cli.verbose, cli.quiet);
    outreach_observe::init_tracing(filter, otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init().await?;

    let result = dispatch(cli, state).await;
    outreach_observe::shutdown_tracing();
    result
}

async fn dispatch(cli: Cli, state: AppState) -> anyhow::Result<()> {
    let json = cli.json;

    match cli.command {
        Commands::Campaign { action } => match action {
            CampaignCommand::Create {
                name,
                sender_name,
                sender_email,
                reply_to,
            } => {
                cli::campaign::create_campaign(&state, name, sender_name, sender_email, reply_to, json)
                    .await?;
            }
            CampaignCommand::List { status } => {
                cli::campaign::list_campaigns(&state, status, json).await?;
            }
            CampaignCommand::Show { id } => {
                cli::campaign::show_campaign(&state, &id, json).await?;
            }
            CampaignCommand::Update {
                id,
                name,
                status,
                sender_name,
                sender_email,
                reply_to,
            } => {
                cli::campaign::update_campaign(
                    &state,
                    &id,
                    name,
                    status,
                    sender_name,
                    sender_email,
                    reply_to,
                    json,
                )
                .await?;
            }
            CampaignCommand::Delete { id, force } => {
                cli::campaign::delete_campaign(&state, &id, force, json).await?;
            }
            CampaignCommand::AddStep {
                id,
                subject,
                content,
            } => {
                cli::campaign::add_step(&state, &id, &subject, &content, json).await?;
            }
            CampaignCommand::Launch { id, yes } => {
                cli::campaign::launch_campaign(&state, &id, yes, json).await?;
            }
            CampaignCommand::Run { id } => {
                cli::campaign::run_campaign(&state, &id, json).await?;
            }
            CampaignCommand::Pause { id } => {
                cli::campaign::pause_campaign(&state, &id, json).await?;
            }
            CampaignCommand::Resume { id } => {
                cli::campaign::resume_campaign(&state, &id, json).await?;
            }
        },

        Commands::Lead { action } => match action {
            LeadCommand::Import {
                file,
                mappings,
                no_detect,
                campaign,
            } => {
                cli::lead::import_leads(&state, &file, &mappings, no_detect, campaign, json).await?;
            }
            LeadCommand::List {
                industry,
                region,
                tag,
                search,
                limit,
                offset,
            } => {
                cli::lead::list_leads(&state, industry, region, tag, search, limit, offset, json)
                    .await?;
            }
            LeadCommand::Add {
                email,
                name,
                company,
                job_title,
                phone,
                industry,
                region,
                tags,
            } => {
                let request = CreateLeadRequest {
                    email,
                    name,
                    company,
                    job_title,
                    phone,
                    industry,
                    region,
                    tags: Some(tags).filter(|t| !t.is_empty()),
                    ..Default::default()
                };
                cli::lead::add_lead(&state, request, json).await?;
            }
            LeadCommand::Delete { ids, force } => {
                cli::lead::delete_leads(&state, &ids, force, json).await?;
            }
            LeadCommand::Unsubscribe { email } => {
                cli::lead::set_subscription(&state, &email, false, json).await?;
            }
            LeadCommand::Resubscribe { email } => {
                cli::lead::set_subscription(&state, &email, true, json).await?;
            }
        },

        Commands::Account { action } => match action {
            AccountCommand::Add {
                name,
                from,
                host,
                port,
                secure,
                username,
            } => {
                cli::account::add_account(&state, name, from, host, port, secure, username, json)
                    .await?;
            }
            AccountCommand::List => {
                cli::account::list_accounts(&state, json).await?;
            }
            AccountCommand::Delete { id, force } => {
                cli::account::delete_account(&state, &id, force, json).await?;
            }
            AccountCommand::Test { id } => {
                cli::account::test_account(&state, &id, json).await?;
            }
        },

        Commands::Send {
            to,
            subject,
            html,
            text,
            account,
        } => {
            let email = OutboundEmail {
                to,
                subject,
                html,
                text,
                ..Default::default()
            };
            cli::send::send_email(&state, email, account, json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, json).await?;
        }

        Commands::Serve { port, host, .. } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Outreach API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {} mail via {}",
                console::style("✉").bold(),
                console::style(state.mailer.name()).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let runner = state.runner.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            runner.shutdown();
            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
