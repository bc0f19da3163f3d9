//! Storefront events that produce transactional email.

use mail_core::Priority;
use serde::{Deserialize, Serialize};

/// A monetary amount in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (or the currency's minor unit).
    pub amount_cents: i64,
    /// ISO 4217 code.
    pub currency: String,
}

impl Money {
    pub fn new(amount_cents: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_cents,
            currency: currency.into(),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let cents = self.amount_cents.unsigned_abs();
        write!(
            f,
            "{}{}.{:02} {}",
            sign,
            cents / 100,
            cents % 100,
            self.currency
        )
    }
}

/// One purchased line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        Money::new(
            self.unit_price.amount_cents * i64::from(self.quantity),
            self.unit_price.currency.clone(),
        )
    }
}

/// Fulfilment state reported to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub customer_name: String,
    pub order_number: String,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    /// Single-line shipping address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub customer_name: String,
    pub reset_url: String,
    pub expires_in_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub customer_name: String,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub customer_name: String,
    pub order_number: String,
    pub products: Vec<String>,
    pub review_url: String,
}

/// Back-office notification for a newly placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNewOrder {
    pub order_number: String,
    pub customer_email: String,
    pub item_count: u32,
    pub total: Money,
    pub admin_url: String,
}

/// A semantic event together with the data its template needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmailEvent {
    OrderConfirmation(OrderConfirmation),
    PasswordReset(PasswordReset),
    Welcome(Welcome),
    OrderStatusUpdate(OrderStatusUpdate),
    ReviewRequest(ReviewRequest),
    AdminNewOrder(AdminNewOrder),
}

impl EmailEvent {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EmailEvent::OrderConfirmation(_) => "order_confirmation",
            EmailEvent::PasswordReset(_) => "password_reset",
            EmailEvent::Welcome(_) => "welcome",
            EmailEvent::OrderStatusUpdate(_) => "order_status_update",
            EmailEvent::ReviewRequest(_) => "review_request",
            EmailEvent::AdminNewOrder(_) => "admin_new_order",
        }
    }

    /// Priority this kind of email is normally queued with.
    pub fn default_priority(&self) -> Priority {
        match self {
            EmailEvent::PasswordReset(_) | EmailEvent::OrderConfirmation(_) => Priority::High,
            EmailEvent::OrderStatusUpdate(_)
            | EmailEvent::Welcome(_)
            | EmailEvent::AdminNewOrder(_) => Priority::Normal,
            EmailEvent::ReviewRequest(_) => Priority::Low,
        }
    }
}
