//! Lead handlers: list, add, delete and sheet import.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use serde::Deserialize;

use outreach_core::import::resolve_mapping;
use outreach_core::repository::lead::LeadFilter;
use outreach_infra::import::parse_bytes;
use outreach_types::campaign::CampaignId;
use outreach_types::error::{ImportError, LeadError};
use outreach_types::import::{ImportSummary, SheetFormat};
use outreach_types::lead::{CreateLeadRequest, Lead, LeadId};

use crate::http::error::AppError;
use crate::http::extractors::query::{ImportQuery, LeadListQuery, parse_order};
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

type Envelope<T> = Json<ApiResponse<T>>;

fn lead_id(raw: &str) -> Result<LeadId, AppError> {
    raw.parse().map_err(|_| AppError::Lead(LeadError::NotFound))
}

/// GET /api/v1/leads - Filtered, paginated lead list.
///
/// `meta.count` is the number of stored leads, not the page size.
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadListQuery>,
) -> Result<Envelope<Vec<Lead>>, AppError> {
    let timer = RequestTimer::start();
    let filter = LeadFilter {
        industry: query.industry,
        region: query.region,
        tag: query.tag,
        search: query.q,
        sort_order: parse_order(query.order.as_deref()),
        limit: query.limit,
        offset: query.offset,
    };
    let leads = state.lead_service.list_leads(Some(filter)).await?;
    let total = state.lead_service.count_leads().await?;
    Ok(Json(
        timer
            .respond(leads)
            .with_count(total.max(0) as usize)
            .with_link("self", "/api/v1/leads")
            .with_link("import", "/api/v1/leads/import"),
    ))
}

/// POST /api/v1/leads
pub async fn create_lead(
    State(state): State<AppState>,
    Json(body): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Envelope<Lead>), AppError> {
    let timer = RequestTimer::start();
    let lead = state.lead_service.add_lead(body).await?;
    let link = format!("/api/v1/leads/{}", lead.id);
    Ok((StatusCode::CREATED, Json(timer.respond(lead).with_link("self", &link))))
}

/// GET /api/v1/leads/{id}
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Lead>, AppError> {
    let timer = RequestTimer::start();
    let id = lead_id(&id)?;
    let lead = state.lead_service.get_lead(&id).await?;
    Ok(Json(
        timer
            .respond(lead)
            .with_link("self", &format!("/api/v1/leads/{id}")),
    ))
}

/// DELETE /api/v1/leads/{id}
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let id = lead_id(&id)?;
    state.lead_service.delete_lead(&id).await?;
    Ok(Json(timer.respond(serde_json::json!({"deleted": true, "id": id}))))
}

#[derive(Debug, Deserialize)]
pub struct DeleteLeadsBody {
    pub ids: Vec<LeadId>,
}

/// DELETE /api/v1/leads - Bulk delete; unknown ids are skipped.
pub async fn delete_leads(
    State(state): State<AppState>,
    Json(body): Json<DeleteLeadsBody>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let timer = RequestTimer::start();
    let deleted = state.lead_service.delete_leads(&body.ids).await?;
    Ok(Json(timer.respond(serde_json::json!({"deleted": deleted}))))
}

/// Sheet format from `?format=`, falling back to the Content-Type header.
fn request_format(query: &ImportQuery, headers: &HeaderMap) -> Result<SheetFormat, ImportError> {
    if let Some(format) = &query.format {
        return format.parse();
    }
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(ImportError::UnsupportedFormat)?;
    SheetFormat::from_mime(mime)
}

/// POST /api/v1/leads/import - Import the raw CSV/XLSX request body.
///
/// ```bash
/// curl -X POST 'localhost:3000/api/v1/leads/import?map=email=E-mail' \
///      -H 'Content-Type: text/csv' --data-binary @leads.csv
/// ```
pub async fn import_leads(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Envelope<ImportSummary>, AppError> {
    let timer = RequestTimer::start();

    let campaign: Option<CampaignId> = match &query.campaign_id {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| AppError::Lead(LeadError::CampaignNotFound))?,
        ),
        None => None,
    };
    let format = request_format(&query, &headers)?;
    let sheet = parse_bytes(&body, format)?;
    let mapping = resolve_mapping(&sheet.columns, &query.assignments(), query.detect)?;

    tracing::debug!(%format, rows = sheet.rows.len(), "importing leads over HTTP");
    let summary = state
        .lead_service
        .import_sheet(&sheet, &mapping, campaign.as_ref())
        .await?;
    Ok(Json(
        timer
            .respond(summary)
            .with_link("leads", "/api/v1/leads"),
    ))
}
