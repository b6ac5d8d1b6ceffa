use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthRouterExt, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::services::branches::CreateBranchInput;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBranchRequest {
    pub city: Option<String>,
    /// Email address of the agent to assign.
    pub branch_agent: Option<String>,
    #[serde(default)]
    pub main_branch: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CitySearchQuery {
    pub city: Option<String>,
}

/// Branch registry routes: reads are open to anyone, writes are
/// admin-only.
pub fn branch_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/branches", get(list_branches))
        .route("/branches/search", get(search_branches));

    let write = Router::new()
        .route("/branches", post(create_branch))
        .with_min_role(Role::Admin);

    read.merge(write)
}

/// List every branch.
#[utoipa::path(
    get,
    path = "/branches",
    responses(
        (status = 200, description = "All registered branches"),
        (status = 500, description = "Internal server error")
    ),
    tag = "branches"
)]
pub async fn list_branches(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let branches = state.services.branches.list_branches().await?;
    let payload = state.services.branches.to_responses(branches).await?;
    Ok(success_response(payload))
}

/// Case-insensitive substring search over branch cities.
#[utoipa::path(
    get,
    path = "/branches/search",
    params(CitySearchQuery),
    responses(
        (status = 200, description = "Branches whose city matches the query"),
        (status = 500, description = "Internal server error")
    ),
    tag = "branches"
)]
pub async fn search_branches(
    State(state): State<AppState>,
    Query(query): Query<CitySearchQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let city = query.city.unwrap_or_default();
    let branches = state.services.branches.search_by_city(&city).await?;
    let payload = state.services.branches.to_responses(branches).await?;
    Ok(success_response(payload))
}

/// Create a branch and assign its agent. Admin only.
#[utoipa::path(
    post,
    path = "/branches",
    request_body = CreateBranchRequest,
    responses(
        (status = 201, description = "Branch created"),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "branches"
)]
pub async fn create_branch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = state
        .services
        .branches
        .create_branch(CreateBranchInput {
            city: payload.city,
            branch_agent: payload.branch_agent,
            main_branch: payload.main_branch,
        })
        .await?;

    let mut response = state.services.branches.to_response(branch).await?;
    response.message = Some("Successfully created the branch!".to_string());
    Ok(created_response(response))
}
