use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{Duration, Utc};
use courseline_api::{
    config::AppConfig,
    db,
    entities::{coupon, course, course_module, section, user, user::UserRole},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        certificates::{LocalMediaStore, PassthroughRenderer},
        notifications::NoopMailer,
        pricing::StaticRates,
    },
    AppState,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by a
/// throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("create temp dir for test database");
        let db_path = db_dir.path().join("courseline_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            &cfg,
            Arc::new(StaticRates::new(cfg.rates.clone())),
            Arc::new(NoopMailer),
            Arc::new(PassthroughRenderer),
            Arc::new(LocalMediaStore),
            Some(event_sender),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", courseline_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed a user row directly.
    pub async fn seed_user(&self, role: UserRole, platform_fee: Decimal) -> user::Model {
        let now = Utc::now();
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            name: Set(format!("Test User {}", id.simple())),
            email: Set(format!("user-{}@example.com", id.simple())),
            role: Set(role),
            platform_fee: Set(platform_fee),
            profits: Set(0),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user for tests")
    }

    pub async fn seed_student(&self) -> user::Model {
        self.seed_user(UserRole::Student, Decimal::ZERO).await
    }

    /// Seed a course owned by `instructor_id` with the given list price.
    pub async fn seed_course(
        &self,
        instructor_id: Uuid,
        price_amount: Decimal,
        price_currency: &str,
    ) -> course::Model {
        let now = Utc::now();
        course::ActiveModel {
            id: Set(Uuid::new_v4()),
            instructor_id: Set(instructor_id),
            title: Set("Practical Systems Programming".to_string()),
            price_amount: Set(price_amount),
            price_currency: Set(price_currency.to_string()),
            duration_hours: Set(0),
            duration_minutes: Set(0),
            duration_seconds: Set(0),
            ratings_average: Set(Decimal::ZERO),
            ratings_quantity: Set(0),
            profits: Set(0),
            published: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed course for tests")
    }

    /// Set the course's total duration and add one section with modules
    /// of the given lengths (in seconds). Returns the module rows.
    pub async fn seed_modules(
        &self,
        course: &course::Model,
        total_secs: i64,
        module_secs: &[i64],
    ) -> Vec<course_module::Model> {
        use sea_orm::IntoActiveModel;

        let mut active = course.clone().into_active_model();
        active.duration_hours = Set(0);
        active.duration_minutes = Set(0);
        active.duration_seconds = Set(total_secs as i32);
        active
            .update(&*self.state.db)
            .await
            .expect("set course duration");

        let section = section::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(course.id),
            title: Set("Section 1".to_string()),
            position: Set(0),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed section for tests");

        let mut modules = Vec::new();
        for (i, secs) in module_secs.iter().enumerate() {
            let module = course_module::ActiveModel {
                id: Set(Uuid::new_v4()),
                course_id: Set(course.id),
                section_id: Set(Some(section.id)),
                title: Set(format!("Module {}", i + 1)),
                duration_hours: Set(0),
                duration_minutes: Set(0),
                duration_seconds: Set(*secs as i32),
            }
            .insert(&*self.state.db)
            .await
            .expect("seed module for tests");
            modules.push(module);
        }
        modules
    }

    /// Seed a coupon for a course.
    pub async fn seed_coupon(
        &self,
        course_id: Uuid,
        code: &str,
        discount: Decimal,
        maximum_uses: Option<i32>,
    ) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            discount: Set(discount),
            expires_at: Set(Utc::now() + Duration::days(30)),
            maximum_uses: Set(maximum_uses),
            uses: Set(0),
            course_id: Set(course_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Deserialize a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not valid json")
}
