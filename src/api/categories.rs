//! Category endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::category::{Category, CreateCategory},
};

use super::{ApiJson, AuthenticatedUser};

/// List all categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Create a category (staff only)
#[utoipa::path(
    post,
    path = "/categories",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    user.require_staff()?;
    request.validate()?;

    let created = state.services.catalog.create_category(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
