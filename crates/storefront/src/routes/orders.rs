//! Order handlers for customers and admins.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use hoi_core::OrderId;

use crate::db::{OrderRepository, Pagination, ProductRepository, UserRepository};
use crate::error::Result;
use crate::middleware::{ApiJson, RequireAdmin, RequireAuth};
use crate::services::orders::{
    ADMIN_PAGE_SIZE, CancelRequestInput, CreateOrderInput, OrderService, StatusUpdateInput,
};
use crate::state::AppState;

/// Query string of the admin order list.
#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Repositories borrowed for the duration of one request.
struct Stores<'a> {
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> Stores<'a> {
    fn new(state: &'a AppState) -> Self {
        Self {
            orders: OrderRepository::new(state.pool()),
            products: ProductRepository::new(state.pool()),
            users: UserRepository::new(state.pool()),
        }
    }

    fn service(&'a self, state: &'a AppState) -> OrderService<'a> {
        OrderService::new(
            &self.orders,
            &self.products,
            &self.users,
            state.dispatcher(),
        )
    }
}

pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiJson(input): ApiJson<CreateOrderInput>,
) -> Result<impl IntoResponse> {
    let stores = Stores::new(&state);
    let order = stores.service(&state).create(&caller, &input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<impl IntoResponse> {
    let stores = Stores::new(&state);
    let orders = stores.service(&state).list_mine(&caller).await?;
    Ok(Json(orders))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let stores = Stores::new(&state);
    let order = stores.service(&state).get_for(&caller, id).await?;
    Ok(Json(order))
}

pub async fn request_cancel(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<OrderId>,
    ApiJson(input): ApiJson<CancelRequestInput>,
) -> Result<impl IntoResponse> {
    let stores = Stores::new(&state);
    let order = stores
        .service(&state)
        .request_cancel(&caller, id, &input)
        .await?;
    Ok(Json(json!({
        "message": "Cancellation request submitted",
        "order": order,
    })))
}

pub async fn admin_list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AdminListQuery>,
) -> Result<impl IntoResponse> {
    let page = Pagination::new(query.page, query.limit, ADMIN_PAGE_SIZE);
    let stores = Stores::new(&state);
    let listing = stores
        .service(&state)
        .admin_list(query.status.as_deref(), page)
        .await?;
    Ok(Json(json!({
        "page": listing.page.page,
        "limit": listing.page.limit,
        "total": listing.total,
        "orders": listing.orders,
    })))
}

pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    ApiJson(input): ApiJson<StatusUpdateInput>,
) -> Result<impl IntoResponse> {
    let stores = Stores::new(&state);
    let order = stores
        .service(&state)
        .update_status(&admin, id, &input)
        .await?;
    Ok(Json(order))
}
