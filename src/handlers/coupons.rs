use crate::entities::coupon;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::coupons::CreateCouponRequest;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    /// Percentage discount in [0, 100]
    pub discount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub maximum_uses: Option<i32>,
    pub uses: i32,
    pub course_id: Uuid,
}

impl From<coupon::Model> for CouponResponse {
    fn from(model: coupon::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            discount: model.discount,
            expires_at: model.expires_at,
            maximum_uses: model.maximum_uses,
            uses: model.uses,
            course_id: model.course_id,
        }
    }
}

/// Create a coupon
#[utoipa::path(
    post,
    path = "/api/v1/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = crate::ApiResponse<CouponResponse>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "Coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponResponse>>), ServiceError> {
    let coupon = state.services.coupons.create_coupon(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(coupon.into())),
    ))
}

/// Get coupon by code
#[utoipa::path(
    get,
    path = "/api/v1/coupons/{code}",
    params(
        ("code" = String, Path, description = "Coupon code")
    ),
    responses(
        (status = 200, description = "Coupon details", body = crate::ApiResponse<CouponResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Coupons"
)]
pub async fn get_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<CouponResponse>>, ServiceError> {
    let coupon = state.services.coupons.get_by_code(&code).await?;
    Ok(Json(ApiResponse::success(coupon.into())))
}

/// List coupons for a course
#[utoipa::path(
    get,
    path = "/api/v1/coupons/course/{course_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course coupons", body = crate::ApiResponse<Vec<CouponResponse>>)
    ),
    tag = "Coupons"
)]
pub async fn list_course_coupons(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CouponResponse>>>, ServiceError> {
    let coupons = state.services.coupons.list_for_course(course_id).await?;
    Ok(Json(ApiResponse::success(
        coupons.into_iter().map(Into::into).collect(),
    )))
}

/// Coupon routes
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_coupon))
        .route("/{code}", get(get_coupon))
        .route("/course/{course_id}", get(list_course_coupons))
}
