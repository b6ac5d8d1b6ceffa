use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::cargo::{CreateCargoInput, UpdateCargoInput};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCargoRequest {
    pub title: Option<String>,
    /// Recipient's email address.
    pub recipient: Option<String>,
    /// Destination branch city.
    pub destination: Option<String>,
    /// Booking branch city.
    pub booking_station: Option<String>,
    pub weight: Option<Decimal>,
}

/// PATCH body. Only the mutable fields are deserialized; anything else
/// in the payload (weight, sender, title, ...) is dropped on the floor.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateCargoRequest {
    pub current_location: Option<String>,
    pub destination: Option<String>,
}

pub fn cargo_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/cargo", get(list_cargo))
        .route("/cargo/:id", get(get_cargo))
        .with_auth();

    let create = Router::new().route("/cargo", post(create_cargo)).with_auth();

    let update = Router::new()
        .route("/cargo/:id", patch(update_cargo))
        .with_min_role(Role::Agent);

    read.merge(create).merge(update)
}

pub async fn list_cargo(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let records = state.services.cargo.list_scoped(&user).await?;
    let payload = state.services.cargo.to_responses(records).await?;
    Ok(success_response(payload))
}

pub async fn get_cargo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.cargo.get_scoped(id, &user).await?;
    let payload = state.services.cargo.to_response(record).await?;
    Ok(success_response(payload))
}

/// Book new cargo. The sender is always the authenticated customer;
/// staff accounts book through the order flow instead.
pub async fn create_cargo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCargoRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if user.is_staff() {
        return Err(ServiceError::Forbidden(
            "Only customers may book cargo.".to_string(),
        ));
    }

    let sender = state
        .services
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| ServiceError::AuthError("Unknown user account".to_string()))?;

    let record = state
        .services
        .cargo
        .create_cargo(
            &sender,
            CreateCargoInput {
                title: payload.title,
                recipient: payload.recipient,
                destination: payload.destination,
                booking_station: payload.booking_station,
                weight: payload.weight,
            },
        )
        .await?;

    let mut response = state.services.cargo.to_response(record).await?;
    response.message = Some(
        "Successfully created your cargo. You will be notified when the agent approves \
         your booking."
            .to_string(),
    );
    Ok(created_response(response))
}

pub async fn update_cargo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCargoRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .cargo
        .update_cargo(
            id,
            &user,
            UpdateCargoInput {
                current_location: payload.current_location,
                destination: payload.destination,
            },
        )
        .await?;

    let payload = state.services.cargo.to_response(record).await?;
    Ok(success_response(payload))
}
