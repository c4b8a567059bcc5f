mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use courseline_api::entities::user::UserRole;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn passing_score_earns_a_certificate() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/certificates",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "score": 85,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let serial = body["data"]["serial_number"].as_str().unwrap();
    assert!(serial.starts_with("CERT-"));
    assert_eq!(
        body["data"]["url"].as_str().unwrap(),
        format!("https://media.local/certificates/{}.pdf", serial)
    );
    assert_eq!(body["data"]["score"], 85);
    assert_eq!(body["data"]["issuer"], "Courseline");
}

#[tokio::test]
async fn failing_score_is_rejected() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/certificates",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "score": 65,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reissuing_returns_the_certificate_on_file() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;

    let payload = json!({
        "user_id": student.id,
        "course_id": course.id,
        "score": 90,
    });
    let first = app
        .request(Method::POST, "/api/v1/certificates", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_body = response_json(first).await;

    // A second request, even with a different score, returns the original.
    let second = app
        .request(
            Method::POST,
            "/api/v1/certificates",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "score": 100,
            })),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CREATED);
    let second_body = response_json(second).await;
    assert_eq!(second_body["data"]["id"], first_body["data"]["id"]);
    assert_eq!(
        second_body["data"]["serial_number"],
        first_body["data"]["serial_number"]
    );
    assert_eq!(second_body["data"]["score"], 90);
}

#[tokio::test]
async fn missing_user_or_course_is_not_found() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;

    let no_user = app
        .request(
            Method::POST,
            "/api/v1/certificates",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "course_id": course.id,
                "score": 80,
            })),
        )
        .await;
    assert_eq!(no_user.status(), StatusCode::NOT_FOUND);

    let no_course = app
        .request(
            Method::POST,
            "/api/v1/certificates",
            Some(json!({
                "user_id": student.id,
                "course_id": Uuid::new_v4(),
                "score": 80,
            })),
        )
        .await;
    assert_eq!(no_course.status(), StatusCode::NOT_FOUND);
}
