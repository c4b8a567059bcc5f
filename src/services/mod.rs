pub mod certificates;
pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod notifications;
pub mod pricing;
pub mod progress;
pub mod ratings;
pub mod reviews;
pub mod users;
