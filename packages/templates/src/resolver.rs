//! Rendering of storefront events into email messages.

use std::fmt::Write;

use mail_core::EmailMessage;
use serde::{Deserialize, Serialize};

use crate::events::{
    AdminNewOrder, EmailEvent, OrderConfirmation, OrderStatus, OrderStatusUpdate, PasswordReset,
    ReviewRequest, Welcome,
};

/// Store details shared by every template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreBranding {
    pub store_name: String,
    pub store_url: String,
    pub support_email: String,
}

impl Default for StoreBranding {
    fn default() -> Self {
        Self {
            store_name: "Storefront".to_string(),
            store_url: "http://localhost:3000".to_string(),
            support_email: "support@localhost".to_string(),
        }
    }
}

/// Renders events into subject/html/text triples.
#[derive(Debug, Clone, Default)]
pub struct TemplateResolver {
    branding: StoreBranding,
}

/// Partially rendered message before the shared layout is applied.
struct Body {
    subject: String,
    html: String,
    text: String,
}

impl TemplateResolver {
    pub fn new(branding: StoreBranding) -> Self {
        Self { branding }
    }

    pub fn branding(&self) -> &StoreBranding {
        &self.branding
    }

    /// Render `event`. Pure: the same event always yields the same message.
    pub fn resolve(&self, event: &EmailEvent) -> EmailMessage {
        let body = match event {
            EmailEvent::OrderConfirmation(data) => self.order_confirmation(data),
            EmailEvent::PasswordReset(data) => self.password_reset(data),
            EmailEvent::Welcome(data) => self.welcome(data),
            EmailEvent::OrderStatusUpdate(data) => self.order_status_update(data),
            EmailEvent::ReviewRequest(data) => self.review_request(data),
            EmailEvent::AdminNewOrder(data) => self.admin_new_order(data),
        };
        self.layout(body)
    }

    fn layout(&self, body: Body) -> EmailMessage {
        let store = escape_html(&self.branding.store_name);
        let support = escape_html(&self.branding.support_email);
        let html = format!(
            "<!DOCTYPE html><html><body style=\"font-family:sans-serif;color:#222\">\
             <h1 style=\"font-size:20px\">{store}</h1>{body}\
             <hr><p style=\"font-size:12px;color:#777\">Questions? Contact \
             <a href=\"mailto:{support}\">{support}</a>.</p></body></html>",
            store = store,
            body = body.html,
            support = support,
        );
        let text = format!(
            "{}\n\n{}\n\n--\n{} | {}\n",
            self.branding.store_name, body.text, self.branding.store_url, self.branding.support_email
        );
        EmailMessage::new(body.subject, html, text)
    }

    fn order_confirmation(&self, data: &OrderConfirmation) -> Body {
        let mut rows = String::new();
        let mut lines = String::new();
        for item in &data.items {
            let _ = write!(
                rows,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&item.name),
                item.quantity,
                item.line_total()
            );
            let _ = writeln!(lines, "- {} x{}: {}", item.name, item.quantity, item.line_total());
        }

        let address_html = data
            .shipping_address
            .as_deref()
            .map(|a| format!("<p>Shipping to: {}</p>", escape_html(a)))
            .unwrap_or_default();
        let address_text = data
            .shipping_address
            .as_deref()
            .map(|a| format!("Shipping to: {}\n", a))
            .unwrap_or_default();

        Body {
            subject: format!(
                "Order {} confirmed - {}",
                data.order_number, self.branding.store_name
            ),
            html: format!(
                "<p>Hi {name},</p><p>Thank you for your order <strong>{order}</strong>.</p>\
                 <table><tr><th>Item</th><th>Qty</th><th>Price</th></tr>{rows}</table>\
                 <p>Subtotal: {subtotal}<br>Shipping: {shipping}<br>Tax: {tax}<br>\
                 <strong>Total: {total}</strong></p>{address}",
                name = escape_html(&data.customer_name),
                order = escape_html(&data.order_number),
                rows = rows,
                subtotal = data.subtotal,
                shipping = data.shipping,
                tax = data.tax,
                total = data.total,
                address = address_html,
            ),
            text: format!(
                "Hi {},\n\nThank you for your order {}.\n\n{}\nSubtotal: {}\nShipping: {}\nTax: {}\nTotal: {}\n{}",
                data.customer_name,
                data.order_number,
                lines,
                data.subtotal,
                data.shipping,
                data.tax,
                data.total,
                address_text,
            ),
        }
    }

    fn password_reset(&self, data: &PasswordReset) -> Body {
        Body {
            subject: format!("Reset your {} password", self.branding.store_name),
            html: format!(
                "<p>Hi {name},</p><p>We received a request to reset your password.</p>\
                 <p><a href=\"{url}\">Choose a new password</a></p>\
                 <p>This link expires in {minutes} minutes. If you did not ask for a reset, \
                 you can ignore this email.</p>",
                name = escape_html(&data.customer_name),
                url = escape_html(&data.reset_url),
                minutes = data.expires_in_minutes,
            ),
            text: format!(
                "Hi {},\n\nWe received a request to reset your password.\n\
                 Choose a new password: {}\n\n\
                 This link expires in {} minutes. If you did not ask for a reset, you can ignore this email.",
                data.customer_name, data.reset_url, data.expires_in_minutes
            ),
        }
    }

    fn welcome(&self, data: &Welcome) -> Body {
        Body {
            subject: format!("Welcome to {}", self.branding.store_name),
            html: format!(
                "<p>Hi {name},</p><p>Your account is ready.</p>\
                 <p><a href=\"{url}\">Start shopping</a></p>",
                name = escape_html(&data.customer_name),
                url = escape_html(&self.branding.store_url),
            ),
            text: format!(
                "Hi {},\n\nYour account is ready.\nStart shopping: {}",
                data.customer_name, self.branding.store_url
            ),
        }
    }

    fn order_status_update(&self, data: &OrderStatusUpdate) -> Body {
        let headline = match data.status {
            OrderStatus::Processing => "is being prepared",
            OrderStatus::Shipped => "has shipped",
            OrderStatus::Delivered => "has been delivered",
            OrderStatus::Cancelled => "has been cancelled",
            OrderStatus::Refunded => "has been refunded",
        };

        let mut html = format!(
            "<p>Hi {name},</p><p>Your order <strong>{order}</strong> {headline}.</p>",
            name = escape_html(&data.customer_name),
            order = escape_html(&data.order_number),
            headline = headline,
        );
        let mut text = format!(
            "Hi {},\n\nYour order {} {}.\n",
            data.customer_name, data.order_number, headline
        );

        if let Some(url) = &data.tracking_url {
            let _ = write!(
                html,
                "<p><a href=\"{}\">Track your package</a></p>",
                escape_html(url)
            );
            let _ = writeln!(text, "Track your package: {}", url);
        }
        if let Some(note) = &data.note {
            let _ = write!(html, "<p>{}</p>", escape_html(note));
            let _ = writeln!(text, "{}", note);
        }

        Body {
            subject: format!("Order {} {}", data.order_number, data.status.as_str()),
            html,
            text,
        }
    }

    fn review_request(&self, data: &ReviewRequest) -> Body {
        let items_html: String = data
            .products
            .iter()
            .map(|p| format!("<li>{}</li>", escape_html(p)))
            .collect();
        let items_text: String = data.products.iter().map(|p| format!("- {}\n", p)).collect();

        Body {
            subject: format!("How was your order {}?", data.order_number),
            html: format!(
                "<p>Hi {name},</p><p>We hope you are enjoying your purchase:</p>\
                 <ul>{items}</ul><p><a href=\"{url}\">Leave a review</a></p>",
                name = escape_html(&data.customer_name),
                items = items_html,
                url = escape_html(&data.review_url),
            ),
            text: format!(
                "Hi {},\n\nWe hope you are enjoying your purchase:\n{}\nLeave a review: {}",
                data.customer_name, items_text, data.review_url
            ),
        }
    }

    fn admin_new_order(&self, data: &AdminNewOrder) -> Body {
        Body {
            subject: format!("New order {} ({})", data.order_number, data.total),
            html: format!(
                "<p>A new order was placed.</p><p>Order: <strong>{order}</strong><br>\
                 Customer: {customer}<br>Items: {count}<br>Total: {total}</p>\
                 <p><a href=\"{url}\">Open in admin</a></p>",
                order = escape_html(&data.order_number),
                customer = escape_html(&data.customer_email),
                count = data.item_count,
                total = data.total,
                url = escape_html(&data.admin_url),
            ),
            text: format!(
                "A new order was placed.\nOrder: {}\nCustomer: {}\nItems: {}\nTotal: {}\nOpen in admin: {}",
                data.order_number, data.customer_email, data.item_count, data.total, data.admin_url
            ),
        }
    }
}

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
