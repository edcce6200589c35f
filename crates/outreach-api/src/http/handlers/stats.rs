//! Dashboard statistics endpoint.
//!
//! GET /api/v1/stats - Campaign and lead totals plus what the runner is
//! doing right now.

use axum::Json;
use axum::extract::State;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();

    let summary = state.campaign_service.dashboard().await?;
    let running = state.runner.all_progress();
    let accounts = state.account_service.list_accounts().await?.len();

    let data = serde_json::json!({
        "total_campaigns": summary.total_campaigns,
        "active_campaigns": summary.active_campaigns,
        "total_leads": summary.total_leads,
        "total_sent": summary.total_sent,
        "total_replies": summary.total_replies,
        "mail_accounts": accounts,
        "transport": state.mailer.name(),
        "running": running,
    });

    Ok(Json(
        timer
            .respond(data)
            .with_link("self", "/api/v1/stats")
            .with_link("campaigns", "/api/v1/campaigns"),
    ))
}
