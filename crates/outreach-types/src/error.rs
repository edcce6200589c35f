use thiserror::Error;

/// Errors related to campaign operations.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("campaign not found")]
    NotFound,

    #[error("invalid campaign name: {0}")]
    InvalidName(String),

    #[error("invalid campaign status: '{0}'")]
    InvalidStatus(String),

    #[error("campaign is not ready to launch: {0}")]
    NotLaunchable(String),

    #[error("step '{0}' not found")]
    StepNotFound(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors related to lead operations.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("lead not found")]
    NotFound,

    #[error("invalid email address: '{0}'")]
    InvalidEmail(String),

    #[error("lead with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("campaign not found")]
    CampaignNotFound,

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors raised while reading a lead file into rows.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported file format")]
    UnsupportedFormat,

    #[error("file is empty")]
    Empty,

    #[error("Row {row} has incorrect number of columns")]
    ColumnCount { row: usize },

    #[error("column '{0}' is not present in the file")]
    UnknownColumn(String),

    #[error("no column is mapped to email")]
    MissingEmailMapping,

    #[error("unknown lead field '{0}'")]
    UnknownField(String),

    #[error("Failed to parse file: {0}")]
    Parse(String),

    #[error("File reading error: {0}")]
    Io(String),
}

/// Errors from mail transports and mail account management.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail account not found")]
    AccountNotFound,

    #[error("mail transport is not configured: {0}")]
    NotConfigured(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors from the campaign batch runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Campaign is already running")]
    AlreadyRunning,

    #[error("Campaign is not running")]
    NotRunning,

    #[error("Campaign is not paused")]
    NotPaused,

    #[error("campaign has no steps")]
    NoSteps,

    #[error("campaign has no leads")]
    NoLeads,

    #[error(transparent)]
    Campaign(#[from] CampaignError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Errors from repository operations (used by trait definitions in outreach-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
