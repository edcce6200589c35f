//! Mail transport port, its object-safe wrapper, and message composition.

pub mod box_transport;
pub mod template;
pub mod transport;

pub use box_transport::BoxMailTransport;
pub use template::{choose_variant, compose_step_email, render_template};
pub use transport::{MailTransport, TransportFactory};
