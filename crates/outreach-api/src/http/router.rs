//! Axum router configuration with middleware.
//!
//! Resource routes live under `/api/v1/`; the one-off send endpoint is
//! mounted at `/api/send-email`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Campaigns
        .route(
            "/campaigns",
            post(handlers::campaign::create_campaign).get(handlers::campaign::list_campaigns),
        )
        .route(
            "/campaigns/{id}",
            get(handlers::campaign::get_campaign)
                .put(handlers::campaign::update_campaign)
                .delete(handlers::campaign::delete_campaign),
        )
        .route("/campaigns/{id}/steps", post(handlers::campaign::add_step))
        .route(
            "/campaigns/{id}/leads",
            get(handlers::campaign::list_campaign_leads).put(handlers::campaign::set_campaign_leads),
        )
        .route(
            "/campaigns/{id}/validate",
            get(handlers::campaign::validate_campaign),
        )
        // Runner controls
        .route("/campaigns/{id}/start", post(handlers::campaign::start_campaign))
        .route("/campaigns/{id}/pause", post(handlers::campaign::pause_campaign))
        .route("/campaigns/{id}/resume", post(handlers::campaign::resume_campaign))
        .route("/campaigns/{id}/progress", get(handlers::campaign::get_progress))
        // Leads
        .route(
            "/leads",
            get(handlers::lead::list_leads)
                .post(handlers::lead::create_lead)
                .delete(handlers::lead::delete_leads),
        )
        .route("/leads/import", post(handlers::lead::import_leads))
        .route(
            "/leads/{id}",
            get(handlers::lead::get_lead).delete(handlers::lead::delete_lead),
        )
        // Mail accounts
        .route(
            "/mail-accounts",
            get(handlers::account::list_accounts).post(handlers::account::create_account),
        )
        .route(
            "/mail-accounts/{id}",
            get(handlers::account::get_account)
                .put(handlers::account::update_account)
                .delete(handlers::account::delete_account),
        )
        .route("/mail-accounts/{id}/test", post(handlers::account::test_account))
        // Suppression list
        .route(
            "/unsubscribes/{email}",
            post(handlers::unsubscribe::unsubscribe).delete(handlers::unsubscribe::resubscribe),
        )
        // Dashboard
        .route("/stats", get(handlers::stats::get_stats))
        .route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/api/send-email", post(handlers::mail::send_email))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness plus a database round-trip.
async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let database = sqlx::query("SELECT 1")
        .execute(&state.db_pool.reader)
        .await
        .is_ok();
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        axum::Json(serde_json::json!({
            "status": if database { "ok" } else { "degraded" },
            "database": database,
            "transport": state.mailer.name(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
