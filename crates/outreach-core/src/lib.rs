//! Business logic and repository trait definitions for Outreach.
//!
//! This crate defines the "ports" (repository and mail transport traits)
//! that the infrastructure layer implements, plus the services, the import
//! mapping and the campaign runner built on them. It depends only on
//! `outreach-types` -- never on `outreach-infra` or any database/IO crate.

pub mod event;
pub mod import;
pub mod mail;
pub mod repository;
pub mod runner;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
