pub mod certificates;
pub mod common;
pub mod coupons;
pub mod courses;
pub mod progress;
pub mod reviews;
pub mod transactions;
pub mod users;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    certificates::{CertificateService, DocumentRenderer, MediaStore},
    coupons::CouponService,
    courses::CourseService,
    enrollments::EnrollmentService,
    notifications::NotificationSender,
    pricing::SharedRates,
    progress::ProgressService,
    reviews::ReviewService,
    users::UserService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub coupons: CouponService,
    pub courses: CourseService,
    pub enrollments: EnrollmentService,
    pub progress: ProgressService,
    pub reviews: ReviewService,
    pub users: UserService,
    pub certificates: CertificateService,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        _config: &AppConfig,
        rates: SharedRates,
        notifier: Arc<dyn NotificationSender>,
        renderer: Arc<dyn DocumentRenderer>,
        media: Arc<dyn MediaStore>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let coupons = CouponService::new(db.clone());
        let courses = CourseService::new(db.clone());
        let reviews = ReviewService::new(db.clone(), event_sender.clone());
        let enrollments = EnrollmentService::new(
            db.clone(),
            rates,
            coupons.clone(),
            notifier.clone(),
            event_sender.clone(),
        );
        let progress = ProgressService::new(db.clone(), event_sender.clone());
        let users = UserService::new(db.clone(), reviews.clone());
        let certificates = CertificateService::new(db, renderer, media, notifier, event_sender);
        Self {
            coupons,
            courses,
            enrollments,
            progress,
            reviews,
            users,
            certificates,
        }
    }
}
