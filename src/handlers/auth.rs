use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthRouterExt, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::users::CreateUserInput;
use crate::AppState;

/// Login request payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration request payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginData {
    pub access: String,
    pub refresh: String,
    pub token_type: String,
    pub expires_in: i64,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountData {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub message: String,
}

pub fn auth_routes() -> Router<AppState> {
    let open = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh));

    let admin_only = Router::new()
        .route("/agent", post(create_agent))
        .with_min_role(Role::Admin);

    open.merge(admin_only)
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = payload
        .email
        .ok_or_else(|| ServiceError::validation("email", "email must be provided."))?;
    let password = payload
        .password
        .ok_or_else(|| ServiceError::validation("password", "password must be provided."))?;

    let user = state.services.users.authenticate(&email, &password).await?;
    let tokens = state.auth.generate_token_pair(&user).await?;

    info!(user_id = %user.id, "user logged in");

    Ok(success_response(LoginData {
        access: tokens.access,
        refresh: tokens.refresh,
        token_type: tokens.token_type,
        expires_in: tokens.expires_in,
        message: "Successfully logged you in. Welcome to CargoTracker!".to_string(),
    }))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .register(CreateUserInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(created_response(AccountData {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        message: "Successfully registered your account.".to_string(),
    }))
}

/// Admin-only creation of branch-agent accounts.
async fn create_agent(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .create_agent(CreateUserInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(created_response(AccountData {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        message: "Successfully created the agent account.".to_string(),
    }))
}

/// Invalidate the submitted refresh token so it can no longer mint
/// access tokens.
async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let refresh = payload
        .refresh
        .ok_or_else(|| ServiceError::invalid("You are already logged out"))?;

    state.auth.revoke_refresh_token(&refresh).await?;

    Ok(success_response(serde_json::json!({
        "message": "You have been successfully logged out."
    })))
}

async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let refresh = payload
        .refresh
        .ok_or_else(|| ServiceError::validation("refresh", "refresh must be provided."))?;

    let access = state.auth.refresh_access_token(&refresh).await?;

    Ok(success_response(serde_json::json!({ "access": access })))
}
