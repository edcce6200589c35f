//! Campaign handlers: CRUD, sequence steps, recipients and the runner
//! controls (start, pause, resume, progress).

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use outreach_core::repository::campaign::CampaignFilter;
use outreach_core::runner::CampaignProgress;
use outreach_types::campaign::{
    Campaign, CampaignId, CampaignStatus, CreateCampaignRequest, UpdateCampaignRequest,
};
use outreach_types::error::CampaignError;
use outreach_types::lead::{Lead, LeadId};

use crate::http::error::AppError;
use crate::http::extractors::query::{CampaignListQuery, parse_order};
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

type Envelope<T> = Json<ApiResponse<T>>;

fn campaign_id(raw: &str) -> Result<CampaignId, AppError> {
    raw.parse().map_err(|_| AppError::Campaign(CampaignError::NotFound))
}

fn self_link(id: &CampaignId) -> String {
    format!("/api/v1/campaigns/{id}")
}

/// POST /api/v1/campaigns - Create a draft campaign.
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Envelope<Campaign>), AppError> {
    let timer = RequestTimer::start();
    let campaign = state.campaign_service.create_campaign(body).await?;
    let link = self_link(&campaign.id);
    let resp = timer
        .respond(campaign)
        .with_link("self", &link)
        .with_link("leads", &format!("{link}/leads"));
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/campaigns - List campaigns, optionally by status.
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<CampaignListQuery>,
) -> Result<Envelope<Vec<Campaign>>, AppError> {
    let timer = RequestTimer::start();

    let status = match &query.status {
        Some(s) => Some(s.parse::<CampaignStatus>().map_err(AppError::Validation)?),
        None => None,
    };
    let filter = CampaignFilter {
        status,
        sort_order: parse_order(query.order.as_deref()),
        limit: query.limit,
        offset: query.offset,
    };

    let campaigns = state.campaign_service.list_campaigns(Some(filter)).await?;
    let count = campaigns.len();
    Ok(Json(
        timer
            .respond(campaigns)
            .with_count(count)
            .with_link("self", "/api/v1/campaigns"),
    ))
}

/// GET /api/v1/campaigns/{id}
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Campaign>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let campaign = state.campaign_service.get_campaign(&id).await?;
    let link = self_link(&id);
    Ok(Json(
        timer
            .respond(campaign)
            .with_link("self", &link)
            .with_link("leads", &format!("{link}/leads"))
            .with_link("progress", &format!("{link}/progress")),
    ))
}

/// PUT /api/v1/campaigns/{id} - Partial update; absent fields are kept.
pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCampaignRequest>,
) -> Result<Envelope<Campaign>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let campaign = state.campaign_service.update_campaign(&id, body).await?;
    Ok(Json(timer.respond(campaign).with_link("self", &self_link(&id))))
}

/// DELETE /api/v1/campaigns/{id} - Stops any run, then deletes.
pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    state.campaign_service.get_campaign(&id).await?;
    state.runner.stop(&id);
    state.campaign_service.delete_campaign(&id).await?;
    Ok(Json(timer.respond(serde_json::json!({"deleted": true, "id": id}))))
}

#[derive(Debug, Deserialize)]
pub struct AddStepBody {
    pub subject: String,
    pub content: String,
}

/// POST /api/v1/campaigns/{id}/steps - Append a sequence step.
pub async fn add_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddStepBody>,
) -> Result<(StatusCode, Envelope<Campaign>), AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let campaign = state
        .campaign_service
        .add_step(&id, &body.subject, &body.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(timer.respond(campaign).with_link("self", &self_link(&id))),
    ))
}

/// GET /api/v1/campaigns/{id}/leads - Recipients in send order.
pub async fn list_campaign_leads(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Vec<Lead>>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let leads = state.campaign_service.campaign_leads(&id).await?;
    let count = leads.len();
    Ok(Json(
        timer
            .respond(leads)
            .with_count(count)
            .with_link("campaign", &self_link(&id)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SetLeadsBody {
    pub lead_ids: Vec<LeadId>,
}

/// PUT /api/v1/campaigns/{id}/leads - Replace the recipients.
pub async fn set_campaign_leads(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetLeadsBody>,
) -> Result<Envelope<Campaign>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let campaign = state.campaign_service.set_leads(&id, body.lead_ids).await?;
    Ok(Json(timer.respond(campaign).with_link("self", &self_link(&id))))
}

/// GET /api/v1/campaigns/{id}/validate - Run the launch checklist.
pub async fn validate_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let data = match state.campaign_service.check_launchable(&id).await {
        Ok(_) => serde_json::json!({"launchable": true}),
        Err(CampaignError::NotLaunchable(reason)) => {
            serde_json::json!({"launchable": false, "reason": reason})
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Json(timer.respond(data)))
}

/// POST /api/v1/campaigns/{id}/start - Launch the campaign on the runner.
pub async fn start_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<CampaignProgress>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    state.campaign_service.check_launchable(&id).await?;
    let progress = state.runner.start(&id).await?;
    Ok(Json(
        timer
            .respond(progress)
            .with_link("progress", &format!("{}/progress", self_link(&id))),
    ))
}

/// POST /api/v1/campaigns/{id}/pause
pub async fn pause_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<CampaignProgress>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let progress = state.runner.pause(&id).await?;
    Ok(Json(timer.respond(progress)))
}

/// POST /api/v1/campaigns/{id}/resume
pub async fn resume_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<CampaignProgress>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let progress = state.runner.resume(&id).await?;
    Ok(Json(timer.respond(progress)))
}

/// GET /api/v1/campaigns/{id}/progress - Stored percentage plus live
/// runner state when the campaign has been started in this process.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let id = campaign_id(&id)?;
    let campaign = state.campaign_service.get_campaign(&id).await?;
    let data = serde_json::json!({
        "status": campaign.status,
        "progress": campaign.progress,
        "metrics": campaign.metrics,
        "runner": state.runner.progress(&id),
    });
    Ok(Json(timer.respond(data).with_link("campaign", &self_link(&id))))
}
