mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use courseline_api::entities::{course, review, user, user::UserRole};
use courseline_api::errors::ServiceError;
use courseline_api::services::reviews::ReviewService;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

async fn course_rating(app: &TestApp, course_id: Uuid) -> (rust_decimal::Decimal, i32) {
    let row = course::Entity::find_by_id(course_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    (row.ratings_average, row.ratings_quantity)
}

async fn write_review(app: &TestApp, user_id: Uuid, course_id: Uuid, rate: i16) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/reviews",
            Some(json!({
                "user_id": user_id,
                "course_id": course_id,
                "rate": rate,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn rating_aggregate_follows_every_mutation() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;

    let alice = app.seed_student().await;
    let bob = app.seed_student().await;
    let carol = app.seed_student().await;

    write_review(&app, alice.id, course.id, 5).await;
    write_review(&app, bob.id, course.id, 4).await;
    let carol_review = write_review(&app, carol.id, course.id, 3).await;
    assert_eq!(course_rating(&app, course.id).await, (dec!(4.0), 3));

    // Deleting the lowest rating lifts the average.
    let delete = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{}", carol_review),
            Some(json!({ "user_id": carol.id })),
        )
        .await;
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);
    assert_eq!(course_rating(&app, course.id).await, (dec!(4.5), 2));
}

#[tokio::test]
async fn rewriting_a_review_replaces_instead_of_duplicating() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let student = app.seed_student().await;

    write_review(&app, student.id, course.id, 5).await;
    write_review(&app, student.id, course.id, 2).await;

    assert_eq!(course_rating(&app, course.id).await, (dec!(2.0), 1));
    let count = review::Entity::find()
        .filter(review::Column::CourseId.eq(course.id))
        .all(&*app.state.db)
        .await
        .unwrap()
        .len();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn updating_a_review_recomputes_the_aggregate() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let alice = app.seed_student().await;
    let bob = app.seed_student().await;

    let review_id = write_review(&app, alice.id, course.id, 4).await;
    write_review(&app, bob.id, course.id, 5).await;

    let update = app
        .request(
            Method::PUT,
            &format!("/api/v1/reviews/{}", review_id),
            Some(json!({ "user_id": alice.id, "rate": 2 })),
        )
        .await;
    assert_eq!(update.status(), StatusCode::OK);
    assert_eq!(course_rating(&app, course.id).await, (dec!(3.5), 2));
}

#[tokio::test]
async fn only_the_author_may_update_a_review() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let author = app.seed_student().await;
    let stranger = app.seed_student().await;

    let review_id = write_review(&app, author.id, course.id, 4).await;

    let update = app
        .request(
            Method::PUT,
            &format!("/api/v1/reviews/{}", review_id),
            Some(json!({ "user_id": stranger.id, "rate": 1 })),
        )
        .await;
    assert_eq!(update.status(), StatusCode::UNAUTHORIZED);

    let delete = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{}", review_id),
            Some(json!({ "user_id": stranger.id })),
        )
        .await;
    assert_eq!(delete.status(), StatusCode::UNAUTHORIZED);

    // An admin may remove any review.
    let admin_delete = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{}", review_id),
            Some(json!({ "user_id": stranger.id, "is_admin": true })),
        )
        .await;
    assert_eq!(admin_delete.status(), StatusCode::NO_CONTENT);
    assert_eq!(course_rating(&app, course.id).await, (dec!(0), 0));
}

#[tokio::test]
async fn deactivating_a_user_purges_reviews_and_recomputes_ratings() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let first_course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let second_course = app.seed_course(instructor.id, dec!(50), "USD").await;

    let leaver = app.seed_student().await;
    let stayer = app.seed_student().await;

    write_review(&app, leaver.id, first_course.id, 1).await;
    write_review(&app, stayer.id, first_course.id, 5).await;
    write_review(&app, leaver.id, second_course.id, 2).await;
    assert_eq!(course_rating(&app, first_course.id).await, (dec!(3.0), 2));

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/deactivate", leaver.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["active"], false);

    // The account survives, the reviews do not.
    let user_row = user::Entity::find_by_id(leaver.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!user_row.active);

    assert_eq!(course_rating(&app, first_course.id).await, (dec!(5.0), 1));
    assert_eq!(course_rating(&app, second_course.id).await, (dec!(0), 0));
}

#[tokio::test]
async fn listing_reviews_for_a_missing_course_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/reviews/course/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Duplicate submissions racing from separate instances share no
/// in-process state; the unique (user, course) index arbitrates. Each
/// submission either lands or conflicts, and the course never ends up
/// with two reviews from one student.
#[tokio::test]
async fn concurrent_duplicate_submissions_leave_one_review() {
    let app = TestApp::new().await;
    let instructor = app.seed_user(UserRole::Instructor, dec!(0.10)).await;
    let course = app.seed_course(instructor.id, dec!(100), "USD").await;
    let student = app.seed_student().await;

    let first = ReviewService::new(app.state.db.clone(), None);
    let second = ReviewService::new(app.state.db.clone(), None);
    let outcomes = {
        let (a, b) = tokio::join!(
            first.create_or_update(student.id, course.id, 5, None),
            second.create_or_update(student.id, course.id, 2, None),
        );
        [a, b]
    };
    for outcome in outcomes {
        if let Err(e) = outcome {
            assert_matches!(e, ServiceError::Conflict(_));
        }
    }

    let reviews = review::Entity::find()
        .filter(review::Column::CourseId.eq(course.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(course_rating(&app, course.id).await.1, 1);
}
