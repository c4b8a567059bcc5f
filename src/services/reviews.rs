use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        course::Entity as Course,
        review::{self, Entity as Review},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::ratings,
};

/// Review mutations. Every path that touches a review ends with a fully
/// awaited rating recompute for the affected course(s), inside the same
/// database transaction as the mutation itself.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReviewService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    fn validate_rate(rate: i16) -> Result<(), ServiceError> {
        if !(1..=5).contains(&rate) {
            return Err(ServiceError::InvalidInput(format!(
                "Rating must be between 1 and 5, got {}",
                rate
            )));
        }
        Ok(())
    }

    /// Creates the user's review for a course, or updates it when one
    /// already exists. One conceptual review per (user, course) pair.
    #[instrument(skip(self, comment), fields(user_id = %user_id, course_id = %course_id))]
    pub async fn create_or_update(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        rate: i16,
        comment: Option<String>,
    ) -> Result<review::Model, ServiceError> {
        Self::validate_rate(rate)?;

        Course::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} not found", course_id)))?;

        let txn = self.db.begin().await?;

        let existing = Review::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::CourseId.eq(course_id))
            .one(&txn)
            .await?;

        let saved = match existing {
            Some(current) => {
                let mut active: review::ActiveModel = current.into();
                active.rate = Set(rate);
                if comment.is_some() {
                    active.comment = Set(comment);
                }
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?
            }
            None => {
                let now = Utc::now();
                let insert = review::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    course_id: Set(course_id),
                    rate: Set(rate),
                    comment: Set(comment),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await;
                match insert {
                    Ok(saved) => saved,
                    // A concurrent submission won the insert; the unique
                    // (user, course) index turns it into a conflict the
                    // client can retry, not a database error.
                    Err(e)
                        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                    {
                        return Err(ServiceError::Conflict(
                            "You have already reviewed this course".to_string(),
                        ));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        ratings::recompute_on(&txn, course_id).await?;
        txn.commit().await?;

        info!(review_id = %saved.id, "Review saved");
        self.emit(Event::ReviewWritten {
            review_id: saved.id,
            course_id,
        })
        .await;

        Ok(saved)
    }

    /// Updates a review in place. Only the owner may edit.
    #[instrument(skip(self, comment))]
    pub async fn update(
        &self,
        review_id: Uuid,
        requester_id: Uuid,
        rate: Option<i16>,
        comment: Option<String>,
    ) -> Result<review::Model, ServiceError> {
        if let Some(rate) = rate {
            Self::validate_rate(rate)?;
        }

        let txn = self.db.begin().await?;

        let current = Review::find_by_id(review_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        if current.user_id != requester_id {
            return Err(ServiceError::Unauthorized(
                "Only the review owner may edit it".to_string(),
            ));
        }

        let course_id = current.course_id;
        let mut active: review::ActiveModel = current.into();
        if let Some(rate) = rate {
            active.rate = Set(rate);
        }
        if comment.is_some() {
            active.comment = Set(comment);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ratings::recompute_on(&txn, course_id).await?;
        txn.commit().await?;

        self.emit(Event::ReviewWritten {
            review_id: updated.id,
            course_id,
        })
        .await;

        Ok(updated)
    }

    /// Deletes a review. Allowed for the owner or an admin.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        review_id: Uuid,
        requester_id: Uuid,
        requester_is_admin: bool,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let current = Review::find_by_id(review_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        if current.user_id != requester_id && !requester_is_admin {
            return Err(ServiceError::Unauthorized(
                "Only the review owner or an admin may delete it".to_string(),
            ));
        }

        let course_id = current.course_id;
        Review::delete_by_id(review_id).exec(&txn).await?;
        ratings::recompute_on(&txn, course_id).await?;
        txn.commit().await?;

        info!(review_id = %review_id, course_id = %course_id, "Review deleted");
        self.emit(Event::ReviewDeleted {
            review_id,
            course_id,
        })
        .await;

        Ok(())
    }

    /// Bulk removal of all reviews by one user (used when an account is
    /// deactivated). Every affected course gets its rating recomputed
    /// before the transaction commits.
    #[instrument(skip(self))]
    pub async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;

        let reviews = Review::find()
            .filter(review::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;
        if reviews.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        let affected_courses: BTreeSet<Uuid> = reviews.iter().map(|r| r.course_id).collect();

        let result = Review::delete_many()
            .filter(review::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        for course_id in &affected_courses {
            ratings::recompute_on(&txn, *course_id).await?;
        }
        txn.commit().await?;

        warn!(
            user_id = %user_id,
            deleted = result.rows_affected,
            courses = affected_courses.len(),
            "Bulk-deleted user reviews"
        );
        Ok(result.rows_affected)
    }

    pub async fn get(&self, review_id: Uuid) -> Result<review::Model, ServiceError> {
        Review::find_by_id(review_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))
    }

    pub async fn list_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<review::Model>, ServiceError> {
        Course::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} not found", course_id)))?;

        Ok(Review::find()
            .filter(review::Column::CourseId.eq(course_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send review event");
            }
        }
    }
}
