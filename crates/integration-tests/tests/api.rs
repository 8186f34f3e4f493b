//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`hoi-cli migrate`)
//! - The storefront running (`cargo run -p hoi-storefront`)
//! - `HOI_ADMIN_TOKEN` for the admin scenarios
//!
//! Run with: `cargo test -p hoi-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hoi_integration_tests::{TestContext, admin_token, shipping_address_json};
use reqwest::StatusCode;
use serde_json::{Value, json};

// ============================================================================
// Health & public endpoints
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let ctx = TestContext::new();

    let resp = ctx.client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = ctx.client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_pincode_check() {
    let ctx = TestContext::new();

    let body: Value = ctx
        .client
        .get(ctx.url("/v1/shipping/check-pincode/248001"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["pincode"], "248001");
    assert_eq!(body["codAllowed"], true);

    let body: Value = ctx
        .client
        .get(ctx.url("/v1/shipping/check-pincode/110001"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["codAllowed"], false);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_product_listing_pagination_shape() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .get(ctx.url("/v1/products?page=1&limit=5"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].is_array());
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 5);
    assert!(body["pagination"]["totalPages"].is_number());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_404() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .get(ctx.url("/v1/products/slug/no-such-product-anywhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Product not found");
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_login_and_userdata() {
    let ctx = TestContext::new();
    let (email, token) = ctx.register_customer().await;

    let resp = ctx
        .client
        .get(ctx.url("/v1/users/userdata"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["role"], "user");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_duplicate_registration_rejected() {
    let ctx = TestContext::new();
    let (email, _) = ctx.register_customer().await;

    let resp = ctx
        .client
        .post(ctx.url("/v1/auth/register"))
        .json(&json!({
            "name": "Again",
            "email": email,
            "phone": "9876543210",
            "address": "Somewhere",
            "password": "another long password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_protected_route_requires_token() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .get(ctx.url("/v1/orders/my-orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .client
        .get(ctx.url("/v1/orders/my-orders"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_customer_cannot_reach_admin_routes() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register_customer().await;

    let resp = ctx
        .client
        .get(ctx.url("/v1/orders/admin/list"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Address book
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_address_book_default_handling() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register_customer().await;

    let resp = ctx
        .client
        .post(ctx.url("/v1/users/addresses"))
        .bearer_auth(&token)
        .json(&shipping_address_json("248001"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let mut second = shipping_address_json("248001");
    second["addressLine1"] = json!("4 Mall Road");
    second["isDefault"] = json!(true);
    let book: Value = ctx
        .client
        .post(ctx.url("/v1/users/addresses"))
        .bearer_auth(&token)
        .json(&second)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let book = book.as_array().unwrap();
    assert_eq!(book.len(), 2);
    assert_eq!(book[0]["isDefault"], false);
    assert_eq!(book[1]["isDefault"], true);

    // Same address again is refused
    let resp = ctx
        .client
        .post(ctx.url("/v1/users/addresses"))
        .bearer_auth(&token)
        .json(&second)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Removing the default promotes the remaining one
    let default_id = book[1]["id"].as_str().unwrap();
    let book: Value = ctx
        .client
        .delete(ctx.url(&format!("/v1/users/addresses/{default_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book[0]["isDefault"], true);
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_empty_order_rejected() {
    let ctx = TestContext::new();
    let (_, token) = ctx.register_customer().await;

    let resp = ctx
        .client
        .post(ctx.url("/v1/orders"))
        .bearer_auth(&token)
        .json(&json!({
            "items": [],
            "shippingAddress": shipping_address_json("248001"),
            "paymentMethod": "COD",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No items in order");
}

#[tokio::test]
#[ignore = "Requires running storefront server with an admin token and at least one product"]
async fn test_order_lifecycle() {
    let ctx = TestContext::new();
    let admin = admin_token().expect("HOI_ADMIN_TOKEN must be set");
    let (_, token) = ctx.register_customer().await;

    let listing: Value = ctx
        .client
        .get(ctx.url("/v1/products?limit=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product = &listing["data"][0];
    let product_id = product["id"].as_i64().expect("no products to order");

    // Place
    let resp = ctx
        .client
        .post(ctx.url("/v1/orders"))
        .bearer_auth(&token)
        .json(&json!({
            "items": [{ "productId": product_id, "quantity": 1 }],
            "shippingAddress": shipping_address_json("248001"),
            "paymentMethod": "COD",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.unwrap();
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["status"], "PLACED");
    assert_eq!(order["paymentStatus"], "PENDING");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("HOI"));

    // Ask to cancel, twice
    let cancel = json!({ "reason": "Ordered by mistake" });
    let resp = ctx
        .client
        .patch(ctx.url(&format!("/v1/orders/{order_id}/request-cancel")))
        .bearer_auth(&token)
        .json(&cancel)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .client
        .patch(ctx.url(&format!("/v1/orders/{order_id}/request-cancel")))
        .bearer_auth(&token)
        .json(&cancel)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Admin cancels
    let order: Value = ctx
        .client
        .patch(ctx.url(&format!("/v1/orders/admin/{order_id}/status")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["status"], "CANCELLED");
    assert_eq!(order["paymentStatus"], "PENDING");
    assert_eq!(order["cancelRequested"], false);

    // Customer sees the cancelled order
    let mine: Value = ctx
        .client
        .get(ctx.url("/v1/orders/my-orders"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine[0]["id"].as_i64(), Some(order_id));
    assert_eq!(mine[0]["status"], "CANCELLED");
}
