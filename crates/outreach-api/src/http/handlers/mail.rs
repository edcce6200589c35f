//! `POST /api/send-email`: forward one message to the configured provider.
//!
//! This endpoint sits outside `/api/v1` and keeps its own small response
//! shape instead of the envelope.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use outreach_types::mail::{OutboundEmail, SendReceipt};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
}

impl From<SendEmailRequest> for OutboundEmail {
    fn from(req: SendEmailRequest) -> Self {
        OutboundEmail {
            to: req.to,
            subject: req.subject,
            html: req.html,
            text: req.text,
            ..Default::default()
        }
    }
}

fn sent_info(receipt: &SendReceipt, to: &str) -> serde_json::Value {
    json!({
        "messageId": receipt.message_id,
        "transport": receipt.transport,
        "accepted": [to],
        "rejected": [],
    })
}

/// Sender is whatever the transport was configured with; the request
/// cannot override it.
pub async fn send_email(
    State(state): State<AppState>,
    Json(body): Json<SendEmailRequest>,
) -> Response {
    let email = OutboundEmail::from(body);
    match state.mailer.send(&email).await {
        Ok(receipt) => {
            tracing::info!(message_id = %receipt.message_id, to = %email.to, "message sent");
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Email sent successfully",
                    "info": sent_info(&receipt, &email.to),
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, to = %email.to, "error sending email");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Error sending email",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
