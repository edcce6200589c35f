//! Broadcast bus for campaign runner events.

pub mod bus;

pub use bus::EventBus;
