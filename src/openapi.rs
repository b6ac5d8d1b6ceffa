use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::services;

/// OpenAPI documentation for the externally interesting surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::branches::list_branches,
        handlers::branches::search_branches,
        handlers::branches::create_branch,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::create_order,
        handlers::orders::update_order,
    ),
    components(schemas(
        handlers::branches::CreateBranchRequest,
        handlers::orders::CreateOrderRequest,
        handlers::orders::UpdateOrderRequest,
        services::branches::BranchResponse,
        services::cargo::CargoResponse,
        services::orders::OrderResponse,
        services::orders::OrderCargoDetail,
        services::orders::OrderStatus,
    )),
    tags(
        (name = "branches", description = "Branch registry"),
        (name = "orders", description = "Order lifecycle and tracking")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
