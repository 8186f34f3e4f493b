//! Payment gateway callbacks.

use axum::{extract::State, http::StatusCode};
use serde_json::Value;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::ApiJson;
use crate::services::payments::{PaymentService, parse_gateway_payload};
use crate::state::AppState;

/// Apply a gateway notification. Answers with an empty body.
pub async fn webhook(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<StatusCode> {
    let event = parse_gateway_payload(&body);
    let orders = OrderRepository::new(state.pool());
    PaymentService::new(&orders, state.dispatcher())
        .handle(&event)
        .await?;
    Ok(StatusCode::OK)
}
