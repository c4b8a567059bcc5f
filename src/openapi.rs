use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Courseline API",
        version = "0.1.0",
        description = r#"
# Courseline Online-Course Platform API

Backend for an online-course platform: enrollment transactions with
coupon discounts and currency conversion, course ratings kept consistent
with the review set, learning-progress tracking and completion
certificates.

## Error Handling

The API uses consistent error response formats with appropriate HTTP
status codes:

```json
{
  "error": "Conflict",
  "message": "You are already enrolled in this course",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::list_pending,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::list_user_transactions,
        crate::handlers::transactions::approve_transaction,
        crate::handlers::transactions::reject_transaction,
        crate::handlers::reviews::write_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,
        crate::handlers::reviews::list_course_reviews,
        crate::handlers::progress::record_watched,
        crate::handlers::progress::get_progress,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::get_coupon,
        crate::handlers::coupons::list_course_coupons,
        crate::handlers::courses::list_courses,
        crate::handlers::courses::get_course,
        crate::handlers::certificates::issue_certificate,
        crate::handlers::users::get_user,
        crate::handlers::users::deactivate_user,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::services::enrollments::CreateTransactionRequest,
        crate::services::enrollments::TransactionResponse,
        crate::services::enrollments::EnrollmentOutcome,
        crate::handlers::transactions::RejectTransactionRequest,
        crate::handlers::reviews::WriteReviewRequest,
        crate::handlers::reviews::UpdateReviewRequest,
        crate::handlers::reviews::DeleteReviewRequest,
        crate::handlers::reviews::ReviewResponse,
        crate::handlers::progress::RecordWatchedRequest,
        crate::services::progress::ProgressResponse,
        crate::services::coupons::CreateCouponRequest,
        crate::handlers::coupons::CouponResponse,
        crate::services::courses::CourseResponse,
        crate::services::courses::CourseDetailResponse,
        crate::services::certificates::IssueCertificateRequest,
        crate::services::certificates::CertificateResponse,
        crate::services::users::UserResponse,
    )),
    tags(
        (name = "Transactions", description = "Enrollment transaction endpoints"),
        (name = "Reviews", description = "Course review endpoints"),
        (name = "Progress", description = "Learning progress endpoints"),
        (name = "Coupons", description = "Coupon endpoints"),
        (name = "Courses", description = "Course catalog endpoints"),
        (name = "Certificates", description = "Completion certificate endpoints"),
        (name = "Users", description = "User account endpoints"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/transactions"));
        assert!(doc.paths.paths.contains_key("/api/v1/progress"));
    }
}
