use crate::errors::ServiceError;
use crate::handlers::common::{PaginatedResponse, PaginationParams};
use crate::handlers::AppState;
use crate::services::courses::{CourseDetailResponse, CourseResponse};
use crate::ApiResponse;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

/// List published courses
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(PaginationParams),
    responses(
        (status = 200, description = "Course catalog", body = crate::ApiResponse<PaginatedResponse<CourseResponse>>)
    ),
    tag = "Courses"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<CourseResponse>>>, ServiceError> {
    let (courses, total) = state
        .services
        .courses
        .list_courses(pagination.offset(), pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        courses,
        pagination.page,
        pagination.per_page,
        total,
    ))))
}

/// Get course by ID
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course details", body = crate::ApiResponse<CourseDetailResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CourseDetailResponse>>, ServiceError> {
    let course = state.services.courses.get_course(course_id).await?;
    Ok(Json(ApiResponse::success(course)))
}

/// Course routes
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses))
        .route("/{course_id}", get(get_course))
}
