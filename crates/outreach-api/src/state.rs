//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository/transport traits, but AppState
//! pins them to the concrete infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use outreach_core::event::EventBus;
use outreach_core::mail::BoxMailTransport;
use outreach_core::runner::{CampaignRunner, RunnerSettings};
use outreach_core::service::campaign::CampaignService;
use outreach_core::service::lead::LeadService;
use outreach_core::service::mail_account::MailAccountService;
use outreach_infra::config::load_global_config;
use outreach_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use outreach_infra::mail::{SmtpTransportFactory, build_transport_or_unconfigured};
use outreach_infra::sqlite::campaign::SqliteCampaignRepository;
use outreach_infra::sqlite::lead::SqliteLeadRepository;
use outreach_infra::sqlite::mail_account::SqliteMailAccountRepository;
use outreach_infra::sqlite::pool::DatabasePool;
use outreach_types::config::GlobalConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteCampaignService = CampaignService<SqliteCampaignRepository, SqliteLeadRepository>;

pub type ConcreteLeadService = LeadService<SqliteLeadRepository, SqliteCampaignRepository>;

pub type ConcreteMailAccountService =
    MailAccountService<SqliteMailAccountRepository, SmtpTransportFactory>;

pub type ConcreteRunner = CampaignRunner<SqliteCampaignRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub campaign_service: Arc<ConcreteCampaignService>,
    pub lead_service: Arc<ConcreteLeadService>,
    pub account_service: Arc<ConcreteMailAccountService>,
    pub runner: ConcreteRunner,
    /// Default transport for one-off messages (`send`, `POST /api/send-email`).
    pub mailer: Arc<BoxMailTransport>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: resolve the data directory, load
    /// config, connect to the DB and wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        ensure_data_dir(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        Self::build(&data_dir, config).await
    }

    /// Wire services over the database in `data_dir` with the given config.
    pub async fn build(data_dir: &Path, config: GlobalConfig) -> anyhow::Result<Self> {
        // The runner owns its transport; one-off sends get their own so a
        // slow campaign batch never holds them up.
        let runner_transport = build_transport_or_unconfigured(&config.mail);
        let mailer = build_transport_or_unconfigured(&config.mail);
        Self::with_transports(data_dir, config, runner_transport, mailer).await
    }

    /// Like [`AppState::build`], with the campaign and one-off transports given.
    pub async fn with_transports(
        data_dir: &Path,
        config: GlobalConfig,
        runner_transport: BoxMailTransport,
        mailer: BoxMailTransport,
    ) -> anyhow::Result<Self> {
        let db_pool = DatabasePool::open_in(data_dir).await?;

        let campaign_service = CampaignService::new(
            SqliteCampaignRepository::new(db_pool.clone()),
            SqliteLeadRepository::new(db_pool.clone()),
        );
        let lead_service = LeadService::new(
            SqliteLeadRepository::new(db_pool.clone()),
            SqliteCampaignRepository::new(db_pool.clone()),
        );
        let account_service = MailAccountService::new(
            SqliteMailAccountRepository::new(db_pool.clone()),
            SmtpTransportFactory,
        );

        let runner = CampaignRunner::new(
            SqliteCampaignRepository::new(db_pool.clone()),
            runner_transport,
            RunnerSettings::from(&config.runner),
            EventBus::default(),
        );

        tracing::debug!(
            data_dir = %data_dir.display(),
            transport = mailer.name(),
            "application state ready"
        );

        Ok(Self {
            campaign_service: Arc::new(campaign_service),
            lead_service: Arc::new(lead_service),
            account_service: Arc::new(account_service),
            runner,
            mailer: Arc::new(mailer),
            config: Arc::new(config),
            data_dir: data_dir.to_path_buf(),
            db_pool,
        })
    }
}
