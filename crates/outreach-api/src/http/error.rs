//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use outreach_types::error::{CampaignError, ImportError, LeadError, MailError, RunnerError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Campaign(CampaignError),
    Lead(LeadError),
    Mail(MailError),
    Runner(RunnerError),
    Import(ImportError),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<CampaignError> for AppError {
    fn from(e: CampaignError) -> Self {
        AppError::Campaign(e)
    }
}

impl From<LeadError> for AppError {
    fn from(e: LeadError) -> Self {
        AppError::Lead(e)
    }
}

impl From<MailError> for AppError {
    fn from(e: MailError) -> Self {
        AppError::Mail(e)
    }
}

impl From<RunnerError> for AppError {
    fn from(e: RunnerError) -> Self {
        AppError::Runner(e)
    }
}

impl From<ImportError> for AppError {
    fn from(e: ImportError) -> Self {
        AppError::Import(e)
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Campaign(CampaignError::NotFound)
            | AppError::Runner(RunnerError::Campaign(CampaignError::NotFound))
            | AppError::Lead(LeadError::CampaignNotFound) => {
                (StatusCode::NOT_FOUND, "CAMPAIGN_NOT_FOUND")
            }
            AppError::Campaign(CampaignError::StepNotFound(_)) => {
                (StatusCode::NOT_FOUND, "STEP_NOT_FOUND")
            }
            AppError::Campaign(CampaignError::InvalidName(_))
            | AppError::Campaign(CampaignError::InvalidStatus(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Campaign(CampaignError::NotLaunchable(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NOT_LAUNCHABLE")
            }
            AppError::Lead(LeadError::NotFound) => (StatusCode::NOT_FOUND, "LEAD_NOT_FOUND"),
            AppError::Lead(LeadError::InvalidEmail(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Lead(LeadError::DuplicateEmail(_)) => {
                (StatusCode::CONFLICT, "DUPLICATE_EMAIL")
            }
            AppError::Lead(LeadError::Import(_)) | AppError::Import(_) => {
                (StatusCode::BAD_REQUEST, "IMPORT_ERROR")
            }
            AppError::Mail(MailError::AccountNotFound) => {
                (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND")
            }
            AppError::Mail(MailError::InvalidAddress(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Mail(MailError::NotConfigured(_))
            | AppError::Runner(RunnerError::Mail(MailError::NotConfigured(_))) => {
                (StatusCode::SERVICE_UNAVAILABLE, "MAIL_NOT_CONFIGURED")
            }
            AppError::Mail(MailError::Transport(_))
            | AppError::Mail(MailError::Provider { .. })
            | AppError::Runner(RunnerError::Mail(_)) => (StatusCode::BAD_GATEWAY, "MAIL_ERROR"),
            AppError::Runner(RunnerError::AlreadyRunning)
            | AppError::Runner(RunnerError::NotRunning)
            | AppError::Runner(RunnerError::NotPaused) => (StatusCode::CONFLICT, "RUNNER_STATE"),
            AppError::Runner(RunnerError::NoSteps) | AppError::Runner(RunnerError::NoLeads) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NOT_LAUNCHABLE")
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Campaign(_)
            | AppError::Lead(_)
            | AppError::Mail(_)
            | AppError::Runner(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Campaign(e) => e.to_string(),
            AppError::Lead(e) => e.to_string(),
            AppError::Mail(e) => e.to_string(),
            AppError::Runner(e) => e.to_string(),
            AppError::Import(e) => e.to_string(),
            AppError::Validation(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(code, "{message}");
        } else {
            tracing::debug!(code, "{message}");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
