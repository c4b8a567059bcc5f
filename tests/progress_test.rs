mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use courseline_api::entities::user::UserRole;
use courseline_api::services::progress::ProgressService;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn watching_modules_accumulates_progress_idempotently() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    // 900s course, two 90s modules.
    let modules = app.seed_modules(&course, 900, &[90, 90]).await;

    let watch = |module_id: Uuid| {
        json!({
            "user_id": student.id,
            "course_id": course.id,
            "module_id": module_id,
        })
    };

    let first = app
        .request(Method::PUT, "/api/v1/progress", Some(watch(modules[0].id)))
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = response_json(first).await;
    assert_eq!(body["data"]["progress"], 10);
    assert_eq!(body["data"]["watched_time_secs"], 90);

    // Replaying the same module changes nothing.
    let replay = app
        .request(Method::PUT, "/api/v1/progress", Some(watch(modules[0].id)))
        .await;
    assert_eq!(replay.status(), StatusCode::OK);
    let body = response_json(replay).await;
    assert_eq!(body["data"]["progress"], 10);
    assert_eq!(body["data"]["watched_time_secs"], 90);

    let second = app
        .request(Method::PUT, "/api/v1/progress", Some(watch(modules[1].id)))
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let body = response_json(second).await;
    assert_eq!(body["data"]["progress"], 20);
    assert_eq!(body["data"]["watched_time_secs"], 180);
}

#[tokio::test]
async fn progress_is_clamped_at_one_hundred() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    // A module longer than the declared course total.
    let modules = app.seed_modules(&course, 100, &[150]).await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/progress",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "module_id": modules[0].id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["progress"], 100);
}

#[tokio::test]
async fn zero_duration_course_rejects_progress() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    // The course declares no duration even though a module exists.
    let modules = app.seed_modules(&course, 0, &[60]).await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/progress",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "module_id": modules[0].id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn module_must_belong_to_the_course() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    app.seed_modules(&course, 900, &[90]).await;
    let other_course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let other_modules = app.seed_modules(&other_course, 600, &[60]).await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/progress",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "module_id": other_modules[0].id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn getting_unrecorded_progress_is_not_found() {
    let app = TestApp::new().await;
    let student = app.seed_student().await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/progress/{}/{}", student.id, Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recorded_progress_can_be_read_back() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let modules = app.seed_modules(&course, 900, &[450]).await;

    let record = app
        .request(
            Method::PUT,
            "/api/v1/progress",
            Some(json!({
                "user_id": student.id,
                "course_id": course.id,
                "module_id": modules[0].id,
            })),
        )
        .await;
    assert_eq!(record.status(), StatusCode::OK);

    let read = app
        .request(
            Method::GET,
            &format!("/api/v1/progress/{}/{}", student.id, course.id),
            None,
        )
        .await;
    assert_eq!(read.status(), StatusCode::OK);
    let body = response_json(read).await;
    assert_eq!(body["data"]["progress"], 50);
    assert_eq!(body["data"]["watched_time_secs"], 450);
}

/// Separate service instances, as in a multi-process deployment, share
/// no in-process lock. The optimistic version check must still keep the
/// watched set and the watched time consistent: two distinct modules
/// recorded concurrently both contribute their duration.
#[tokio::test]
async fn concurrent_instances_lose_no_watched_time() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let student = app.seed_student().await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let modules = app.seed_modules(&course, 900, &[90, 90]).await;

    let first = ProgressService::new(app.state.db.clone(), None);
    let second = ProgressService::new(app.state.db.clone(), None);
    let (a, b) = tokio::join!(
        first.record_watched(student.id, course.id, modules[0].id),
        second.record_watched(student.id, course.id, modules[1].id),
    );
    a.unwrap();
    b.unwrap();

    let read = app
        .request(
            Method::GET,
            &format!("/api/v1/progress/{}/{}", student.id, course.id),
            None,
        )
        .await;
    assert_eq!(read.status(), StatusCode::OK);
    let body = response_json(read).await;
    assert_eq!(body["data"]["watched_time_secs"], 180);
    assert_eq!(body["data"]["progress"], 20);
}
