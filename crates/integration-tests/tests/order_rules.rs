//! Order pricing and lifecycle rules exercised through the public library API.
//!
//! No database or server is needed.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::Utc;
use rust_decimal::Decimal;

use hoi_core::{
    AddressType, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ProductId, Role, UserId, cod_allowed,
};
use hoi_storefront::models::{AuthUser, Order, OrderItem, PostalAddress};
use hoi_storefront::services::orders::{
    OrderError, apply_status_change, check_cancel_request, generate_order_number,
};

fn d(n: i64) -> Decimal {
    Decimal::from(n)
}

fn customer() -> AuthUser {
    AuthUser {
        id: UserId::new(7),
        email: "asha@example.com".to_string(),
        role: Role::User,
    }
}

fn admin() -> AuthUser {
    AuthUser {
        id: UserId::new(1),
        email: "owner@hoi.in".to_string(),
        role: Role::Admin,
    }
}

fn order(method: PaymentMethod, status: OrderStatus) -> Order {
    let item = OrderItem {
        product_id: ProductId::new(3),
        name: "Lace Bralette".to_string(),
        image: "/uploads/products/bralette.jpg".to_string(),
        color: Some("Black".to_string()),
        size: Some("M".to_string()),
        mrp: d(999),
        sale_price: d(799),
        quantity: 1,
        line_total: d(799),
        line_mrp_total: d(999),
    };
    let totals = OrderTotals::from_lines([(item.line_mrp_total, item.line_total)]);
    let now = Utc::now();

    Order {
        id: OrderId::new(11),
        order_number: generate_order_number(now),
        user_id: Some(customer().id),
        customer: None,
        items: vec![item],
        shipping_address: PostalAddress {
            name: "Asha Rawat".to_string(),
            phone: "9876543210".to_string(),
            pincode: "248001".to_string(),
            address_line1: "12 Rajpur Road".to_string(),
            address_line2: None,
            city: "Dehradun".to_string(),
            state: "Uttarakhand".to_string(),
            landmark: None,
            address_type: AddressType::Home,
        },
        total_savings: totals.discount_total,
        totals,
        payment_method: method,
        payment_status: PaymentStatus::Pending,
        status,
        notes: None,
        gateway_order_id: None,
        gateway_payment_id: None,
        cancel_requested: false,
        cancel_reason: None,
        cancel_reason_note: None,
        cancel_requested_at: None,
        cancel_approved_at: None,
        cancelled_by: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_single_discounted_line_totals() {
    let totals = order(PaymentMethod::Cod, OrderStatus::Placed).totals;
    assert_eq!(totals.items_total, d(799));
    assert_eq!(totals.mrp_total, d(999));
    assert_eq!(totals.discount_total, d(200));
    assert_eq!(totals.shipping_fee, d(60));
    assert_eq!(totals.grand_total, d(859));
}

#[test]
fn test_free_shipping_from_threshold() {
    let totals = OrderTotals::from_lines([(d(1200), d(999))]);
    assert_eq!(totals.shipping_fee, Decimal::ZERO);
    assert_eq!(totals.grand_total, totals.items_total + totals.shipping_fee);
}

#[test]
fn test_order_number_shape() {
    let number = generate_order_number(Utc::now());
    assert!(number.starts_with("HOI"));
    assert_eq!(number.len(), 13);
    assert!(number[3..].bytes().all(|b| b.is_ascii_digit()));
}

#[test]
fn test_cancel_request_window() {
    for status in [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
    ] {
        assert!(check_cancel_request(&order(PaymentMethod::Cod, status), &customer()).is_ok());
    }

    let shipped = order(PaymentMethod::Cod, OrderStatus::Shipped);
    assert!(matches!(
        check_cancel_request(&shipped, &customer()),
        Err(OrderError::NotCancellable(OrderStatus::Shipped))
    ));
}

#[test]
fn test_second_cancel_request_rejected() {
    let mut placed = order(PaymentMethod::Online, OrderStatus::Placed);
    placed.cancel_requested = true;
    assert!(matches!(
        check_cancel_request(&placed, &customer()),
        Err(OrderError::AlreadyRequested)
    ));
}

#[test]
fn test_cancel_request_by_other_account_forbidden() {
    let placed = order(PaymentMethod::Online, OrderStatus::Placed);
    assert!(matches!(
        check_cancel_request(&placed, &admin()),
        Err(OrderError::Forbidden)
    ));
}

#[test]
fn test_admin_cancel_settles_payment_by_method() {
    let mut online = order(PaymentMethod::Online, OrderStatus::Confirmed);
    online.payment_status = PaymentStatus::Paid;
    assert!(apply_status_change(
        &mut online,
        Some(OrderStatus::Cancelled),
        None,
        &admin(),
        Utc::now()
    ));
    assert_eq!(online.payment_status, PaymentStatus::Refunded);
    assert_eq!(online.cancelled_by, Some(admin().id));

    let mut cod = order(PaymentMethod::Cod, OrderStatus::Placed);
    assert!(apply_status_change(
        &mut cod,
        Some(OrderStatus::Cancelled),
        None,
        &admin(),
        Utc::now()
    ));
    assert_eq!(cod.payment_status, PaymentStatus::Pending);
}

#[test]
fn test_repeat_cancel_does_not_restock_again() {
    let mut cancelled = order(PaymentMethod::Cod, OrderStatus::Cancelled);
    assert!(!apply_status_change(
        &mut cancelled,
        Some(OrderStatus::Cancelled),
        None,
        &admin(),
        Utc::now()
    ));
}

#[test]
fn test_cod_delivery_marks_paid() {
    let mut cod = order(PaymentMethod::Cod, OrderStatus::OutForDelivery);
    apply_status_change(
        &mut cod,
        Some(OrderStatus::Delivered),
        None,
        &admin(),
        Utc::now(),
    );
    assert_eq!(cod.payment_status, PaymentStatus::Paid);
}

#[test]
fn test_pincode_rule() {
    assert!(cod_allowed("248001"));
    assert!(!cod_allowed("110001"));
    assert!(!cod_allowed("24800"));
}

#[test]
fn test_order_serializes_flat_totals() {
    let placed = order(PaymentMethod::Cod, OrderStatus::Placed);
    let body = serde_json::to_value(&placed).unwrap();
    assert_eq!(body["grandTotal"], "859");
    assert_eq!(body["status"], "PLACED");
    assert_eq!(body["paymentMethod"], "COD");
}
