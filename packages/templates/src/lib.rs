//! Transactional email templates for the storefront.
//!
//! Callers resolve an [`EmailEvent`] into an [`mail_core::EmailMessage`]
//! before submitting it to the queue; the queue never renders.

mod events;
mod resolver;

pub use events::{
    AdminNewOrder, EmailEvent, Money, OrderConfirmation, OrderLine, OrderStatus,
    OrderStatusUpdate, PasswordReset, ReviewRequest, Welcome,
};
pub use resolver::{StoreBranding, TemplateResolver, escape_html};
