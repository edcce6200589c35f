//! Domain services.
//!
//! Services are generic over the repository traits so they can be wired to
//! SQLite in the binary and to in-memory doubles in tests.

pub mod campaign;
pub mod lead;
pub mod mail_account;
