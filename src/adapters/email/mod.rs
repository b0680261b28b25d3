//! Email adapters - transactional notifications.

mod resend_sender;
mod templates;

pub use resend_sender::{ResendConfig, ResendNotificationSender};
pub use templates::{render, RenderedEmail};
