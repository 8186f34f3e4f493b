//! Order repository.
//!
//! Line items and the shipping address are stored as JSONB snapshots.
//! Reads join the owning account so notifications can reach the customer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use hoi_core::{
    Email, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, UserId,
};

use super::{OrderStore, Pagination, RepositoryError};
use crate::models::{NewOrder, Order, OrderCustomer, OrderItem, PostalAddress};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.user_id, o.items, o.shipping_address,
           o.mrp_total, o.items_total, o.discount_total, o.shipping_fee, o.grand_total,
           o.total_savings, o.payment_method, o.payment_status, o.status, o.notes,
           o.gateway_order_id, o.gateway_payment_id, o.cancel_requested, o.cancel_reason,
           o.cancel_reason_note, o.cancel_requested_at, o.cancel_approved_at, o.cancelled_by,
           o.created_at, o.updated_at,
           u.name AS customer_name, u.email AS customer_email, u.phone AS customer_phone
    FROM orders o
    LEFT JOIN users u ON u.id = o.user_id
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: Option<i32>,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<PostalAddress>,
    mrp_total: Decimal,
    items_total: Decimal,
    discount_total: Decimal,
    shipping_fee: Decimal,
    grand_total: Decimal,
    total_savings: Decimal,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    status: OrderStatus,
    notes: Option<String>,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    cancel_requested: bool,
    cancel_reason: Option<String>,
    cancel_reason_note: Option<String>,
    cancel_requested_at: Option<DateTime<Utc>>,
    cancel_approved_at: Option<DateTime<Utc>>,
    cancelled_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let user_id = r.user_id.map(UserId::new);

        let customer = match (user_id, r.customer_email) {
            (Some(id), Some(raw)) => {
                let email = Email::parse(&raw).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
                })?;
                Some(OrderCustomer {
                    id,
                    name: r.customer_name.unwrap_or_default(),
                    email,
                    phone: r.customer_phone.unwrap_or_default(),
                })
            }
            _ => None,
        };

        Ok(Self {
            id: OrderId::new(r.id),
            order_number: r.order_number,
            user_id,
            customer,
            items: r.items.0,
            shipping_address: r.shipping_address.0,
            totals: OrderTotals {
                mrp_total: r.mrp_total,
                items_total: r.items_total,
                discount_total: r.discount_total,
                shipping_fee: r.shipping_fee,
                grand_total: r.grand_total,
            },
            total_savings: r.total_savings,
            payment_method: r.payment_method,
            payment_status: r.payment_status,
            status: r.status,
            notes: r.notes,
            gateway_order_id: r.gateway_order_id,
            gateway_payment_id: r.gateway_payment_id,
            cancel_requested: r.cancel_requested,
            cancel_reason: r.cancel_reason,
            cancel_reason_note: r.cancel_reason_note,
            cancel_requested_at: r.cancel_requested_at,
            cancel_approved_at: r.cancel_approved_at,
            cancelled_by: r.cancelled_by.map(UserId::new),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository<'_> {
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let t = &order.totals;
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO orders (
                order_number, user_id, items, shipping_address,
                mrp_total, items_total, discount_total, shipping_fee, grand_total, total_savings,
                payment_method, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(&order.order_number)
        .bind(order.user_id.as_i32())
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(t.mrp_total)
        .bind(t.items_total)
        .bind(t.discount_total)
        .bind(t.shipping_fee)
        .bind(t.grand_total)
        .bind(t.total_savings())
        .bind(order.payment_method)
        .bind(order.notes.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order number"))?;

        self.find_by_id(OrderId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.gateway_order_id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(gateway_order_id)
            .fetch_optional(self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.as_i32())
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list(
        &self,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let sql = format!(
            "{ORDER_SELECT} WHERE ($1::order_status IS NULL OR o.status = $1) \
             ORDER BY o.created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((orders, total))
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders SET
                payment_status = $2,
                status = $3,
                gateway_order_id = $4,
                gateway_payment_id = $5,
                cancel_requested = $6,
                cancel_reason = $7,
                cancel_reason_note = $8,
                cancel_requested_at = $9,
                cancel_approved_at = $10,
                cancelled_by = $11,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(order.id.as_i32())
        .bind(order.payment_status)
        .bind(order.status)
        .bind(order.gateway_order_id.as_deref())
        .bind(order.gateway_payment_id.as_deref())
        .bind(order.cancel_requested)
        .bind(order.cancel_reason.as_deref())
        .bind(order.cancel_reason_note.as_deref())
        .bind(order.cancel_requested_at)
        .bind(order.cancel_approved_at)
        .bind(order.cancelled_by.map(|id| id.as_i32()))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
