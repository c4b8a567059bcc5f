use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::users::UserResponse;
use crate::ApiResponse;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

/// Get user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = crate::ApiResponse<UserResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let user = state.services.users.get_user(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Deactivate a user account
///
/// The account is kept for bookkeeping; the user's reviews are removed
/// and every affected course rating is recomputed.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/deactivate",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deactivated", body = crate::ApiResponse<UserResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let user = state.services.users.deactivate(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// User routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(get_user))
        .route("/{user_id}/deactivate", post(deactivate_user))
}
