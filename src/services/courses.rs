use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        course::{self, Entity as Course},
        course_enrollment::{self, Entity as CourseEnrollment},
    },
    errors::ServiceError,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    pub price_amount: Decimal,
    pub price_currency: String,
    pub ratings_average: Decimal,
    pub ratings_quantity: i32,
    pub published: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub enrolled_students: u64,
    pub duration_secs: i64,
}

/// Read surface for the course catalog.
#[derive(Clone)]
pub struct CourseService {
    db: Arc<DbPool>,
}

impl CourseService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Published courses, newest first, plus the total for pagination.
    pub async fn list_courses(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<CourseResponse>, u64), ServiceError> {
        let query = Course::find().filter(course::Column::Published.eq(true));
        let total = query.clone().count(&*self.db).await?;
        let courses = query
            .order_by_desc(course::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await?;
        Ok((courses.into_iter().map(model_to_response).collect(), total))
    }

    pub async fn get_course(&self, course_id: Uuid) -> Result<CourseDetailResponse, ServiceError> {
        let course = Course::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} not found", course_id)))?;
        let enrolled_students = CourseEnrollment::find()
            .filter(course_enrollment::Column::CourseId.eq(course_id))
            .count(&*self.db)
            .await?;
        let duration_secs = course.duration_in_seconds();
        Ok(CourseDetailResponse {
            course: model_to_response(course),
            enrolled_students,
            duration_secs,
        })
    }
}

fn model_to_response(model: course::Model) -> CourseResponse {
    CourseResponse {
        id: model.id,
        instructor_id: model.instructor_id,
        title: model.title,
        price_amount: model.price_amount,
        price_currency: model.price_currency,
        ratings_average: model.ratings_average,
        ratings_quantity: model.ratings_quantity,
        published: model.published,
    }
}
