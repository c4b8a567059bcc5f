use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    /// List price in the course's native currency.
    pub price_amount: Decimal,
    pub price_currency: String,
    pub duration_hours: i32,
    pub duration_minutes: i32,
    pub duration_seconds: i32,
    /// Derived rating fields, written exclusively by the rating service.
    pub ratings_average: Decimal,
    pub ratings_quantity: i32,
    /// Accumulated course earnings in settlement-currency units.
    /// Written only by the enrollment ledger.
    pub profits: i64,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Total course duration in seconds.
    pub fn duration_in_seconds(&self) -> i64 {
        self.duration_hours as i64 * 3600
            + self.duration_minutes as i64 * 60
            + self.duration_seconds as i64
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id"
    )]
    Instructor,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::course_module::Entity")]
    Modules,
    #[sea_orm(has_many = "super::course_enrollment::Entity")]
    Enrollments,
    #[sea_orm(has_many = "super::section::Entity")]
    Sections,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructor.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::course_enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
