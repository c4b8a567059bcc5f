use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::enrollments::{
    CreateTransactionRequest, EnrollmentOutcome, TransactionResponse,
};
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectTransactionRequest {
    /// Shown to the student, e.g. "Receipt image is unreadable"
    pub reason: Option<String>,
}

/// Create an enrollment transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created", body = crate::ApiResponse<EnrollmentOutcome>),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course or user not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already enrolled", body = crate::errors::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EnrollmentOutcome>>), ServiceError> {
    let outcome = state.services.enrollments.create_transaction(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

/// List transactions awaiting review
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions", body = crate::ApiResponse<Vec<TransactionResponse>>)
    ),
    tag = "Transactions"
)]
pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ServiceError> {
    let transactions = state.services.enrollments.list_pending().await?;
    Ok(Json(ApiResponse::success(transactions)))
}

/// Get transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    params(
        ("transaction_id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction details", body = crate::ApiResponse<TransactionResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ServiceError> {
    let transaction = state
        .services
        .enrollments
        .get_transaction(transaction_id)
        .await?;
    Ok(Json(ApiResponse::success(transaction)))
}

/// Get a user's transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions/user/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User transactions", body = crate::ApiResponse<Vec<TransactionResponse>>)
    ),
    tag = "Transactions"
)]
pub async fn list_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ServiceError> {
    let transactions = state.services.enrollments.list_for_user(user_id).await?;
    Ok(Json(ApiResponse::success(transactions)))
}

/// Approve a pending transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{transaction_id}/approve",
    params(
        ("transaction_id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction approved", body = crate::ApiResponse<EnrollmentOutcome>),
        (status = 400, description = "Not approvable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn approve_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ApiResponse<EnrollmentOutcome>>, ServiceError> {
    let outcome = state
        .services
        .enrollments
        .approve_transaction(transaction_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Reject a pending transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{transaction_id}/reject",
    params(
        ("transaction_id" = Uuid, Path, description = "Transaction ID")
    ),
    request_body = RejectTransactionRequest,
    responses(
        (status = 200, description = "Transaction rejected", body = crate::ApiResponse<TransactionResponse>),
        (status = 400, description = "Not rejectable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Transactions"
)]
pub async fn reject_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<RejectTransactionRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ServiceError> {
    let transaction = state
        .services
        .enrollments
        .reject_transaction(transaction_id, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(transaction)))
}

/// Transaction routes
pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/pending", get(list_pending))
        .route("/{transaction_id}", get(get_transaction))
        .route("/user/{user_id}", get(list_user_transactions))
        .route("/{transaction_id}/approve", post(approve_transaction))
        .route("/{transaction_id}/reject", post(reject_transaction))
}
