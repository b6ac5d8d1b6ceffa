use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::orders::{CreateOrderInput, UpdateOrderInput};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Id of the cargo this order finalizes.
    pub cargo: Option<Uuid>,
    pub price_per_unit_weight: Option<Decimal>,
    #[serde(default)]
    pub past_main_branch: bool,
    pub status: Option<String>,
}

/// PATCH body. Price, the delivery estimates and the tracking id are
/// not part of this shape, so attempts to change them are dropped.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub past_main_branch: Option<bool>,
    pub cargo_picked_up: Option<bool>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
}

pub fn order_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:tracking_id", get(get_order))
        .with_auth();

    let write = Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:tracking_id", patch(update_order))
        .with_min_role(Role::Agent);

    read.merge(write)
}

/// List the orders visible to the requester: everything for admins,
/// handled orders for agents, own orders for customers.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Orders visible to the requester"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state.services.orders.list_scoped(&user).await?;
    let payload = state.services.orders.to_responses(rows).await?;
    Ok(success_response(payload))
}

/// Fetch one order by its tracking identifier.
#[utoipa::path(
    get,
    path = "/orders/{tracking_id}",
    params(("tracking_id" = Uuid, Path, description = "Opaque tracking identifier")),
    responses(
        (status = 200, description = "The order"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No visible order with that tracking id")
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tracking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let (order, cargo_record) = state
        .services
        .orders
        .get_by_tracking_scoped(tracking_id, &user)
        .await?;
    let payload = state.services.orders.to_response(order, cargo_record).await?;
    Ok(success_response(payload))
}

/// Finalize a cargo booking into a priced order. Idempotent per cargo:
/// repeated calls return the existing order with `created = false`.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 200, description = "Cargo already had an order; returned unchanged"),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Cargo not found")
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (order, created) = state
        .services
        .orders
        .get_or_create_order(
            &user,
            CreateOrderInput {
                cargo: payload.cargo,
                price_per_unit_weight: payload.price_per_unit_weight,
                past_main_branch: payload.past_main_branch,
                status: payload.status,
            },
        )
        .await?;

    let cargo_record = state.services.cargo.get_scoped(order.cargo_id, &user).await?;
    let mut response = state.services.orders.to_response(order, cargo_record).await?;
    response.created = Some(created);

    if created {
        response.message = Some("Successfully created the order.".to_string());
        Ok(created_response(response))
    } else {
        Ok(success_response(response))
    }
}

/// Staff update of shipment progress.
#[utoipa::path(
    patch,
    path = "/orders/{tracking_id}",
    params(("tracking_id" = Uuid, Path, description = "Opaque tracking identifier")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated"),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No visible order with that tracking id")
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tracking_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (order, cargo_record) = state
        .services
        .orders
        .update_order(
            tracking_id,
            &user,
            UpdateOrderInput {
                status: payload.status,
                past_main_branch: payload.past_main_branch,
                cargo_picked_up: payload.cargo_picked_up,
                actual_delivery_time: payload.actual_delivery_time,
            },
        )
        .await?;

    let payload = state.services.orders.to_response(order, cargo_record).await?;
    Ok(success_response(payload))
}
