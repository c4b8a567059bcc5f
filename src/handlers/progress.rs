use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::progress::ProgressResponse;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordWatchedRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub module_id: Uuid,
}

/// Record that a module has been watched
#[utoipa::path(
    put,
    path = "/api/v1/progress",
    request_body = RecordWatchedRequest,
    responses(
        (status = 200, description = "Progress recorded", body = crate::ApiResponse<ProgressResponse>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course or module not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    tag = "Progress"
)]
pub async fn record_watched(
    State(state): State<AppState>,
    Json(request): Json<RecordWatchedRequest>,
) -> Result<Json<ApiResponse<ProgressResponse>>, ServiceError> {
    let progress = state
        .services
        .progress
        .record_watched(request.user_id, request.course_id, request.module_id)
        .await?;
    Ok(Json(ApiResponse::success(progress)))
}

/// Get a user's progress in a course
#[utoipa::path(
    get,
    path = "/api/v1/progress/{user_id}/{course_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Progress", body = crate::ApiResponse<ProgressResponse>),
        (status = 404, description = "No progress recorded", body = crate::errors::ErrorResponse)
    ),
    tag = "Progress"
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path((user_id, course_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ProgressResponse>>, ServiceError> {
    let progress = state
        .services
        .progress
        .get_progress(user_id, course_id)
        .await?;
    Ok(Json(ApiResponse::success(progress)))
}

/// Progress routes
pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/", put(record_watched))
        .route("/{user_id}/{course_id}", get(get_progress))
}
