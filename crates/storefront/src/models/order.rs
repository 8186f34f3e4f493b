//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hoi_core::{
    Email, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::address::PostalAddress;

/// Immutable snapshot of one purchased product, variant and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub mrp: Decimal,
    pub sale_price: Decimal,
    pub quantity: i32,
    /// `sale_price * quantity`
    pub line_total: Decimal,
    /// `mrp * quantity`
    pub line_mrp_total: Decimal,
}

/// Contact details of the account that placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    /// `None` once the owning account has been deleted.
    pub user_id: Option<UserId>,
    /// Filled when the owning account still exists.
    pub customer: Option<OrderCustomer>,
    pub items: Vec<OrderItem>,
    pub shipping_address: PostalAddress,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub total_savings: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub cancel_requested: bool,
    pub cancel_reason: Option<String>,
    pub cancel_reason_note: Option<String>,
    pub cancel_requested_at: Option<DateTime<Utc>>,
    pub cancel_approved_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Name to greet in customer emails.
    #[must_use]
    pub fn recipient_name(&self) -> &str {
        let shipping = self.shipping_address.name.trim();
        if !shipping.is_empty() {
            return shipping;
        }
        self.customer
            .as_ref()
            .map_or("Customer", |c| c.name.as_str())
    }

    /// Customer email, when the account is known.
    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().map(|c| c.email.as_str())
    }
}

/// A validated order ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: PostalAddress,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}
