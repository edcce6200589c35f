//! Mail account handlers. Passwords never leave the server unmasked.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use outreach_types::error::MailError;
use outreach_types::mail::{MailAccount, MailAccountId, SaveMailAccountRequest};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

type Envelope<T> = Json<ApiResponse<T>>;

fn account_id(raw: &str) -> Result<MailAccountId, AppError> {
    raw.parse().map_err(|_| AppError::Mail(MailError::AccountNotFound))
}

fn self_link(id: &MailAccountId) -> String {
    format!("/api/v1/mail-accounts/{id}")
}

/// Missing fields on save are a bad request, not an unconfigured transport.
fn save_error(e: MailError) -> AppError {
    match e {
        MailError::NotConfigured(msg) => AppError::Validation(msg),
        other => other.into(),
    }
}

/// GET /api/v1/mail-accounts
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Envelope<Vec<MailAccount>>, AppError> {
    let timer = RequestTimer::start();
    let accounts: Vec<MailAccount> = state
        .account_service
        .list_accounts()
        .await?
        .iter()
        .map(MailAccount::redacted)
        .collect();
    let count = accounts.len();
    Ok(Json(
        timer
            .respond(accounts)
            .with_count(count)
            .with_link("self", "/api/v1/mail-accounts"),
    ))
}

/// POST /api/v1/mail-accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<SaveMailAccountRequest>,
) -> Result<(StatusCode, Envelope<MailAccount>), AppError> {
    let timer = RequestTimer::start();
    let account = state
        .account_service
        .save_account(None, body)
        .await
        .map_err(save_error)?;
    let link = self_link(&account.id);
    Ok((
        StatusCode::CREATED,
        Json(
            timer
                .respond(account.redacted())
                .with_link("self", &link)
                .with_link("test", &format!("{link}/test")),
        ),
    ))
}

/// GET /api/v1/mail-accounts/{id}
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<MailAccount>, AppError> {
    let timer = RequestTimer::start();
    let id = account_id(&id)?;
    let account = state.account_service.get_account(&id).await?;
    Ok(Json(
        timer
            .respond(account.redacted())
            .with_link("self", &self_link(&id)),
    ))
}

/// PUT /api/v1/mail-accounts/{id} - Replace the account's settings.
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SaveMailAccountRequest>,
) -> Result<Envelope<MailAccount>, AppError> {
    let timer = RequestTimer::start();
    let id = account_id(&id)?;
    let account = state
        .account_service
        .save_account(Some(&id), body)
        .await
        .map_err(save_error)?;
    Ok(Json(
        timer
            .respond(account.redacted())
            .with_link("self", &self_link(&id)),
    ))
}

/// DELETE /api/v1/mail-accounts/{id}
pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let id = account_id(&id)?;
    state.account_service.get_account(&id).await?;
    state.account_service.delete_account(&id).await?;
    Ok(Json(timer.respond(serde_json::json!({"deleted": true, "id": id}))))
}

/// POST /api/v1/mail-accounts/{id}/test - Connect and authenticate only.
pub async fn test_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let id = account_id(&id)?;
    state.account_service.test_connection(&id).await?;
    Ok(Json(
        timer
            .respond(serde_json::json!({"ok": true}))
            .with_link("account", &self_link(&id)),
    ))
}
