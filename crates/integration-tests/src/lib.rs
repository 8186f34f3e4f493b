//! Integration tests for the House of Intimacy storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure library tests
//! cargo test -p hoi-integration-tests
//!
//! # HTTP tests against a running server with a migrated database
//! cargo run -p hoi-cli -- migrate
//! cargo run -p hoi-storefront &
//! cargo test -p hoi-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_rules` - Pricing, cancellation and status rules, no I/O
//! - `api` - HTTP round trips through `/v1` (ignored by default)
//!
//! # Environment Variables
//!
//! - `HOI_API_URL` - Base URL of the running storefront (default: `http://localhost:8000`)
//! - `HOI_ADMIN_TOKEN` - Bearer token of an admin account, for admin endpoint tests

use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the storefront API under test.
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("HOI_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Admin bearer token, if one was provided.
#[must_use]
pub fn admin_token() -> Option<String> {
    std::env::var("HOI_ADMIN_TOKEN").ok().filter(|t| !t.is_empty())
}

/// Shared state for HTTP tests.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("Failed to create HTTP client"),
            base_url: api_base_url(),
        }
    }

    /// Absolute URL for an API path such as `/v1/products`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register a throwaway customer and return `(email, bearer token)`.
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    #[allow(clippy::expect_used)]
    pub async fn register_customer(&self) -> (String, String) {
        let email = format!("it-{}@example.com", Uuid::new_v4().simple());
        let password = "correct horse battery";

        let resp = self
            .client
            .post(self.url("/v1/auth/register"))
            .json(&json!({
                "name": "Integration Tester",
                "email": email,
                "phone": "9876543210",
                "address": "12 Rajpur Road, Dehradun",
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(resp.status().as_u16(), 201, "registration failed");

        let body: Value = self
            .client
            .post(self.url("/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to log in")
            .json()
            .await
            .expect("Login response is not JSON");

        let token = body["token"]
            .as_str()
            .expect("Login response has no token")
            .to_owned();
        (email, token)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete shipping address in the shape clients send.
#[must_use]
pub fn shipping_address_json(pincode: &str) -> Value {
    json!({
        "name": "Asha Rawat",
        "phone": "9876543210",
        "pincode": pincode,
        "addressLine1": "12 Rajpur Road",
        "city": "Dehradun",
        "state": "Uttarakhand",
    })
}
