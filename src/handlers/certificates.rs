use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::certificates::{CertificateResponse, IssueCertificateRequest};
use crate::ApiResponse;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};

/// Issue a completion certificate
#[utoipa::path(
    post,
    path = "/api/v1/certificates",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate issued (or already on file)", body = crate::ApiResponse<CertificateResponse>),
        (status = 400, description = "Score below the passing mark", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course or user not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Rendering or storage failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Certificates"
)]
pub async fn issue_certificate(
    State(state): State<AppState>,
    Json(request): Json<IssueCertificateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CertificateResponse>>), ServiceError> {
    let certificate = state.services.certificates.issue(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(certificate)),
    ))
}

/// Certificate routes
pub fn certificate_routes() -> Router<AppState> {
    Router::new().route("/", post(issue_certificate))
}
