//! HTTP/REST API layer for Outreach.
//!
//! Axum-based REST API at `/api/v1/` with envelope response format and CORS
//! support, plus the bare `POST /api/send-email` relay.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
