//! Shared domain types for Outreach.
//!
//! This crate contains the core records used across the Outreach CRM:
//! Campaign, Lead, MailAccount, import summaries, runner events, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod campaign;
pub mod config;
pub mod error;
pub mod event;
pub mod import;
pub mod lead;
pub mod mail;
