//! Infrastructure layer for Outreach.
//!
//! Contains implementations of the ports defined in `outreach-core`:
//! SQLite repositories, CSV/XLSX lead file readers, SMTP and Mailgun mail
//! transports, plus config loading and data directory resolution.

pub mod config;
pub mod filesystem;
pub mod import;
pub mod mail;
pub mod sqlite;
