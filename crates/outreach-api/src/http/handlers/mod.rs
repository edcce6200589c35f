//! HTTP request handlers for the REST API.

pub mod account;
pub mod campaign;
pub mod lead;
pub mod mail;
pub mod stats;
pub mod unsubscribe;
