use crate::entities::review;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct WriteReviewRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    /// Rating in [1, 5]
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rate: i16,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    /// Requester; must be the review's author
    pub user_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rate: Option<i16>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteReviewRequest {
    /// Requester; must be the author or an admin
    pub user_id: Uuid,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub rate: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<review::Model> for ReviewResponse {
    fn from(model: review::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            course_id: model.course_id,
            rate: model.rate,
            comment: model.comment,
            created_at: model.created_at,
        }
    }
}

/// Create or replace the requester's review of a course
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = WriteReviewRequest,
    responses(
        (status = 201, description = "Review written", body = crate::ApiResponse<ReviewResponse>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent duplicate submission", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn write_review(
    State(state): State<AppState>,
    Json(request): Json<WriteReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ServiceError> {
    request.validate()?;
    let review = state
        .services
        .reviews
        .create_or_update(
            request.user_id,
            request.course_id,
            request.rate,
            request.comment,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(review.into())),
    ))
}

/// Update a review
#[utoipa::path(
    put,
    path = "/api/v1/reviews/{review_id}",
    params(
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = crate::ApiResponse<ReviewResponse>),
        (status = 401, description = "Not the author", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ServiceError> {
    request.validate()?;
    let review = state
        .services
        .reviews
        .update(review_id, request.user_id, request.rate, request.comment)
        .await?;
    Ok(Json(ApiResponse::success(review.into())))
}

/// Delete a review
#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{review_id}",
    params(
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    request_body = DeleteReviewRequest,
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Not the author or an admin", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<DeleteReviewRequest>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .reviews
        .delete(review_id, request.user_id, request.is_admin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List reviews for a course
#[utoipa::path(
    get,
    path = "/api/v1/reviews/course/{course_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course reviews", body = crate::ApiResponse<Vec<ReviewResponse>>),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Reviews"
)]
pub async fn list_course_reviews(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ServiceError> {
    let reviews = state.services.reviews.list_for_course(course_id).await?;
    Ok(Json(ApiResponse::success(
        reviews.into_iter().map(Into::into).collect(),
    )))
}

/// Review routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(write_review))
        .route("/{review_id}", put(update_review))
        .route("/{review_id}", delete(delete_review))
        .route("/course/{course_id}", get(list_course_reviews))
}
