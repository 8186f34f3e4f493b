//! Order lifecycle.
//!
//! Creates orders from cart input against live catalog data, runs the
//! customer cancellation request flow and applies admin status changes with
//! their payment and stock side effects. Emails go out through a
//! [`Dispatcher`] and never fail an operation.

mod error;

pub use error::OrderError;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;

use hoi_core::{OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, ProductId};

use super::addresses::remember_shipping_address;
use super::notify::{Dispatcher, OrderEvent};
use crate::db::{OrderStore, Pagination, ProductStore, UserStore};
use crate::models::{AddressInput, AuthUser, NewOrder, Order, OrderItem, PostalAddress, Product};

/// Page size of the admin order list.
pub const ADMIN_PAGE_SIZE: i64 = 20;

/// One cart line as sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

/// Checkout payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
    pub shipping_address: Option<AddressInput>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Customer cancellation request payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequestInput {
    pub reason: Option<String>,
    pub note: Option<String>,
}

/// Admin status change payload. Values are parsed by the service so unknown
/// spellings become a 400 with a readable message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateInput {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

/// One page of the admin order list.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
    pub page: Pagination,
}

/// Generate an order number: `HOI`, the date as `YYMMDD`, then four random
/// digits.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::rng().random_range(1000..=9999);
    format!("HOI{}{suffix}", now.format("%y%m%d"))
}

/// Snapshot one cart line against its product.
///
/// # Errors
///
/// Returns `InvalidQuantity` if the client sent a quantity below 1.
pub fn snapshot_line(product: &Product, line: &OrderLineInput) -> Result<OrderItem, OrderError> {
    let quantity = line.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(OrderError::InvalidQuantity);
    }

    let mrp = product.details.price.mrp;
    let sale_price = product.details.price.effective_sale();
    let units = Decimal::from(quantity);

    Ok(OrderItem {
        product_id: product.id,
        name: product.details.name.clone(),
        image: product.display_image().to_string(),
        color: non_blank(line.color.as_deref()),
        size: non_blank(line.size.as_deref()),
        mrp,
        sale_price,
        quantity,
        line_total: sale_price * units,
        line_mrp_total: mrp * units,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Apply an admin status change in memory.
///
/// Returns whether stock must be returned, which is only the case the first
/// time an order becomes `CANCELLED`.
pub fn apply_status_change(
    order: &mut Order,
    status: Option<OrderStatus>,
    payment_status: Option<PaymentStatus>,
    admin: &AuthUser,
    now: DateTime<Utc>,
) -> bool {
    let mut restock = false;

    if let Some(status) = status {
        let previous = order.status;
        order.status = status;

        if order.payment_method == PaymentMethod::Cod && status == OrderStatus::Delivered {
            order.payment_status = PaymentStatus::Paid;
        }

        if status == OrderStatus::Cancelled {
            order.cancel_approved_at = Some(now);
            order.cancel_requested = false;
            order.cancelled_by = Some(admin.id);
            order.payment_status = order.payment_method.status_after_cancellation();
            restock = previous != OrderStatus::Cancelled;
        }
    }

    if let Some(payment_status) = payment_status {
        order.payment_status = payment_status;
    }

    order.updated_at = now;
    restock
}

/// Check the cancellation preconditions in order. First failure wins.
///
/// # Errors
///
/// Returns the first failing precondition.
pub fn check_cancel_request(order: &Order, caller: &AuthUser) -> Result<(), OrderError> {
    if order.user_id != Some(caller.id) {
        return Err(OrderError::Forbidden);
    }
    if order.status == OrderStatus::Cancelled {
        return Err(OrderError::AlreadyCancelled);
    }
    if !order.status.accepts_cancel_request() {
        return Err(OrderError::NotCancellable(order.status));
    }
    if order.cancel_requested {
        return Err(OrderError::AlreadyRequested);
    }
    Ok(())
}

/// Order lifecycle operations.
pub struct OrderService<'a> {
    orders: &'a dyn OrderStore,
    products: &'a dyn ProductStore,
    users: &'a dyn UserStore,
    dispatcher: Dispatcher<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        orders: &'a dyn OrderStore,
        products: &'a dyn ProductStore,
        users: &'a dyn UserStore,
        dispatcher: Dispatcher<'a>,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            dispatcher,
        }
    }

    /// Place an order for `caller`.
    ///
    /// Validation happens before any write: an empty cart, an incomplete
    /// address, a bad payment method or any unknown product aborts with
    /// nothing persisted.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of `OrderError` or `Repository`.
    #[tracing::instrument(skip(self, input), fields(user_id = %caller.id))]
    pub async fn create(
        &self,
        caller: &AuthUser,
        input: &CreateOrderInput,
    ) -> Result<Order, OrderError> {
        if input.items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        let shipping_address = input
            .shipping_address
            .as_ref()
            .ok_or(OrderError::MissingAddress)?
            .to_postal()?;
        let payment_method: PaymentMethod = input
            .payment_method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or(OrderError::MissingPaymentMethod)?
            .parse()?;

        let ids: Vec<ProductId> = input.items.iter().map(|i| i.product_id).collect();
        let products = self.products.find_many(&ids).await?;

        let mut missing: Vec<ProductId> = Vec::new();
        for id in &ids {
            if !products.iter().any(|p| p.id == *id) && !missing.contains(id) {
                missing.push(*id);
            }
        }
        if !missing.is_empty() {
            return Err(OrderError::UnknownProducts(missing));
        }

        let items = input
            .items
            .iter()
            .map(|line| {
                let product = products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .ok_or_else(|| OrderError::UnknownProducts(vec![line.product_id]))?;
                snapshot_line(product, line)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let totals = OrderTotals::from_lines(items.iter().map(|i| (i.line_mrp_total, i.line_total)));

        let order = self
            .orders
            .insert(&NewOrder {
                order_number: generate_order_number(Utc::now()),
                user_id: caller.id,
                items,
                shipping_address,
                totals,
                payment_method,
                notes: non_blank(input.notes.as_deref()),
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            grand_total = %order.totals.grand_total,
            "Order placed"
        );

        self.remember_address(caller, &order.shipping_address).await;
        self.dispatcher.order_event(&order, OrderEvent::Placed).await;

        Ok(order)
    }

    /// Save the shipping address to the caller's book. Failures are logged.
    async fn remember_address(&self, caller: &AuthUser, address: &PostalAddress) {
        let user = match self.users.find_by_id(caller.id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(user_id = %caller.id, "Order owner not found, address not saved");
                return;
            }
            Err(e) => {
                tracing::warn!(user_id = %caller.id, error = %e, "Failed to load address book");
                return;
            }
        };

        let mut book = user.addresses;
        if remember_shipping_address(&mut book, address)
            && let Err(e) = self.users.save_addresses(caller.id, &book).await
        {
            tracing::warn!(user_id = %caller.id, error = %e, "Failed to save shipping address");
        }
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Repository` on database failure.
    pub async fn list_mine(&self, caller: &AuthUser) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(caller.id).await?)
    }

    /// One order, visible to its owner and to admins.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub async fn get_for(&self, caller: &AuthUser, id: OrderId) -> Result<Order, OrderError> {
        let order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !caller.is_admin() && order.user_id != Some(caller.id) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    /// Record a customer's cancellation request and tell the shop.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden`, `AlreadyCancelled`, `NotCancellable`,
    /// `AlreadyRequested` or `MissingReason`, checked in that order.
    #[tracing::instrument(skip(self, input), fields(user_id = %caller.id, order_id = %id))]
    pub async fn request_cancel(
        &self,
        caller: &AuthUser,
        id: OrderId,
        input: &CancelRequestInput,
    ) -> Result<Order, OrderError> {
        let mut order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or(OrderError::NotFound)?;
        check_cancel_request(&order, caller)?;

        let reason = non_blank(input.reason.as_deref()).ok_or(OrderError::MissingReason)?;

        let now = Utc::now();
        order.cancel_requested = true;
        order.cancel_reason = Some(reason);
        order.cancel_reason_note = non_blank(input.note.as_deref());
        order.cancel_requested_at = Some(now);
        order.updated_at = now;
        self.orders.save(&order).await?;

        tracing::info!(order_number = %order.order_number, "Cancellation requested");

        self.dispatcher
            .order_event(&order, OrderEvent::CancellationRequested)
            .await;

        Ok(order)
    }

    /// Apply an admin status and/or payment status change.
    ///
    /// # Errors
    ///
    /// Returns `NothingToUpdate` when neither field is present, `InvalidEnum`
    /// for an unknown value and `NotFound` for a missing order.
    #[tracing::instrument(skip(self, input), fields(user_id = %admin.id, order_id = %id))]
    pub async fn update_status(
        &self,
        admin: &AuthUser,
        id: OrderId,
        input: &StatusUpdateInput,
    ) -> Result<Order, OrderError> {
        let status = parse_optional::<OrderStatus>(input.status.as_deref())?;
        let payment_status = parse_optional::<PaymentStatus>(input.payment_status.as_deref())?;
        if status.is_none() && payment_status.is_none() {
            return Err(OrderError::NothingToUpdate);
        }

        let mut order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or(OrderError::NotFound)?;
        let previous = order.status;

        let restock = apply_status_change(&mut order, status, payment_status, admin, Utc::now());
        self.orders.save(&order).await?;

        tracing::info!(
            order_number = %order.order_number,
            from = %previous,
            to = %order.status,
            payment_status = %order.payment_status,
            "Order status updated"
        );

        if restock {
            self.return_stock(&order).await;
        }

        if let Some(status) = status {
            self.dispatcher
                .order_event(&order, OrderEvent::StatusChanged(status))
                .await;
        }

        Ok(order)
    }

    /// Put every line's quantity back on its product, one product at a time.
    ///
    /// Missing products are skipped. A failed write is logged and the loop
    /// carries on with the next line.
    async fn return_stock(&self, order: &Order) {
        for item in &order.items {
            let product = match self.products.find_by_id(item.product_id).await {
                Ok(Some(product)) => product,
                Ok(None) => {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        "Product gone, skipping stock rollback"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        error = %e,
                        "Failed to load product for stock rollback"
                    );
                    continue;
                }
            };

            let mut product = product;
            product.restock(item.quantity, item.size.as_deref());
            if let Err(e) = self
                .products
                .save_stock(product.id, product.details.total_stock, &product.details.sizes)
                .await
            {
                tracing::error!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    error = %e,
                    "Failed to return stock"
                );
            }
        }
    }

    /// Admin order list, newest first. `status` of `None`, empty or `ALL`
    /// means every status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnum` for an unknown status.
    pub async fn admin_list(
        &self,
        status: Option<&str>,
        page: Pagination,
    ) -> Result<OrderPage, OrderError> {
        let status = match status.map(str::trim) {
            None | Some("" | "ALL") => None,
            Some(s) => Some(s.parse::<OrderStatus>()?),
        };
        let (orders, total) = self.orders.list(status, page).await?;
        Ok(OrderPage {
            orders,
            total,
            page,
        })
    }
}

fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, OrderError>
where
    T: std::str::FromStr<Err = hoi_core::ParseEnumError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
        .map_err(OrderError::from)
}
