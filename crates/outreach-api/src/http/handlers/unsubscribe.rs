//! Suppression list handlers.
//!
//! POST   /api/v1/unsubscribes/{email} - Stop all mail to an address.
//! DELETE /api/v1/unsubscribes/{email} - Allow mail to it again.
//!
//! Both go through the default transport; one without a suppression list
//! answers 503 `MAIL_NOT_CONFIGURED`.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use outreach_types::lead::{is_plausible_email, normalize_email};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Subscription {
    pub email: String,
    pub subscribed: bool,
}

fn address(raw: &str) -> Result<String, AppError> {
    let email = normalize_email(raw);
    if is_plausible_email(&email) {
        Ok(email)
    } else {
        Err(AppError::Validation(format!("'{raw}' is not a valid email address")))
    }
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<Subscription>>, AppError> {
    let timer = RequestTimer::start();
    let email = address(&raw)?;
    state.mailer.unsubscribe(&email).await?;

    let link = format!("/api/v1/unsubscribes/{email}");
    Ok(Json(
        timer
            .respond(Subscription {
                email,
                subscribed: false,
            })
            .with_link("self", &link),
    ))
}

pub async fn resubscribe(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<Subscription>>, AppError> {
    let timer = RequestTimer::start();
    let email = address(&raw)?;
    state.mailer.resubscribe(&email).await?;

    Ok(Json(timer.respond(Subscription {
        email,
        subscribed: true,
    })))
}
