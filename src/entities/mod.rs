pub mod certificate;
pub mod coupon;
pub mod course;
pub mod course_enrollment;
pub mod course_module;
pub mod progress;
pub mod review;
pub mod section;
pub mod transaction;
pub mod user;
