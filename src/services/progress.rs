use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        course::Entity as Course,
        course_module::Entity as CourseModule,
        progress::{
            self, watched_module, watched_module::Entity as WatchedModule, Entity as Progress,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub watched_time_secs: i64,
    /// Percentage of the course watched, clamped to [0, 100].
    pub progress: i16,
}

/// Tracks which modules of a course a learner has watched and keeps the
/// derived completion percentage consistent with that set.
///
/// Concurrency is handled at two levels: an in-process async mutex per
/// (user, course) serialises requests hitting the same record on this
/// instance, and an optimistic version column catches writers on other
/// instances. Replaying an already-watched module is a no-op because the
/// watched set is keyed on (progress, module).
#[derive(Clone)]
pub struct ProgressService {
    db: Arc<DbPool>,
    locks: Arc<DashMap<(Uuid, Uuid), Arc<Mutex<()>>>>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProgressService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db,
            locks: Arc::new(DashMap::new()),
            event_sender,
        }
    }

    /// Records that `user_id` finished watching `module_id` of
    /// `course_id` and returns the updated record.
    #[instrument(skip(self))]
    pub async fn record_watched(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<ProgressResponse, ServiceError> {
        let course = Course::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Course {} not found", course_id)))?;
        let module = CourseModule::find_by_id(module_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Module {} not found", module_id)))?;

        if module.course_id != course_id {
            return Err(ServiceError::InvalidInput(
                "Module does not belong to this course".to_string(),
            ));
        }

        let total_secs = course.duration_in_seconds();
        if total_secs == 0 {
            return Err(ServiceError::InvalidInput(
                "Course has no duration; progress cannot be computed".to_string(),
            ));
        }

        let key = (user_id, course_id);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut current = self.load_or_create(user_id, course_id).await?;

        for attempt in 0..2 {
            // The membership insert and the derived-fields update share
            // one transaction: a version conflict rolls the insert back
            // too, and the retry recomputes from the refetched record so
            // a writer on another instance cannot be overwritten.
            let txn = self.db.begin().await?;

            // Membership insert carries the idempotence: a replay
            // conflicts on the (progress, module) key and changes nothing.
            let watched = watched_module::ActiveModel {
                progress_id: Set(current.id),
                module_id: Set(module_id),
                watched_at: Set(Utc::now()),
            };
            let inserted = WatchedModule::insert(watched)
                .on_conflict(
                    OnConflict::columns([
                        watched_module::Column::ProgressId,
                        watched_module::Column::ModuleId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec(&txn)
                .await;
            match inserted {
                Ok(_) => {}
                Err(DbErr::RecordNotInserted) => {
                    txn.rollback().await?;
                    return Ok(model_to_response(current));
                }
                Err(e) => return Err(e.into()),
            }

            let watched_secs = current.watched_time_secs + module.duration_in_seconds();
            let percent = completion_percent(watched_secs, total_secs);

            match self.try_update(&txn, &current, watched_secs, percent).await? {
                Some(updated) => {
                    txn.commit().await?;
                    info!(
                        user_id = %user_id,
                        course_id = %course_id,
                        progress = updated.progress,
                        "Progress recorded"
                    );
                    self.emit(Event::ProgressRecorded {
                        user_id,
                        course_id,
                        module_id,
                        progress: updated.progress,
                    })
                    .await;
                    return Ok(model_to_response(updated));
                }
                None => {
                    txn.rollback().await?;
                    if attempt == 0 {
                        warn!(
                            user_id = %user_id,
                            course_id = %course_id,
                            "Progress version conflict; retrying"
                        );
                        current = Progress::find_by_id(current.id)
                            .one(&*self.db)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Progress {} not found",
                                    current.id
                                ))
                            })?;
                    }
                }
            }
        }
        Err(ServiceError::ConcurrentModification(course_id))
    }

    pub async fn get_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<ProgressResponse, ServiceError> {
        let record = Progress::find()
            .filter(progress::Column::UserId.eq(user_id))
            .filter(progress::Column::CourseId.eq(course_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No progress recorded for user {} in course {}",
                    user_id, course_id
                ))
            })?;
        Ok(model_to_response(record))
    }

    async fn load_or_create(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<progress::Model, ServiceError> {
        if let Some(record) = Progress::find()
            .filter(progress::Column::UserId.eq(user_id))
            .filter(progress::Column::CourseId.eq(course_id))
            .one(&*self.db)
            .await?
        {
            return Ok(record);
        }
        let now = Utc::now();
        let created = progress::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            course_id: Set(course_id),
            watched_time_secs: Set(0),
            progress: Set(0),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await;
        match created {
            Ok(created) => Ok(created),
            // A writer on another instance created the record between
            // the lookup and the insert; theirs wins.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Progress::find()
                    .filter(progress::Column::UserId.eq(user_id))
                    .filter(progress::Column::CourseId.eq(course_id))
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "No progress recorded for user {} in course {}",
                            user_id, course_id
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Optimistic write: succeeds only if nobody bumped the version since
    /// `current` was read.
    async fn try_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        current: &progress::Model,
        watched_secs: i64,
        percent: i16,
    ) -> Result<Option<progress::Model>, ServiceError> {
        let updated = Progress::update_many()
            .col_expr(
                progress::Column::WatchedTimeSecs,
                sea_orm::sea_query::Expr::value(watched_secs),
            )
            .col_expr(
                progress::Column::Progress,
                sea_orm::sea_query::Expr::value(percent),
            )
            .col_expr(
                progress::Column::Version,
                sea_orm::sea_query::Expr::value(current.version + 1),
            )
            .col_expr(
                progress::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(progress::Column::Id.eq(current.id))
            .filter(progress::Column::Version.eq(current.version))
            .exec(conn)
            .await?;
        if updated.rows_affected == 0 {
            return Ok(None);
        }
        let record = Progress::find_by_id(current.id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Progress {} not found", current.id)))?;
        Ok(Some(record))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send progress event");
            }
        }
    }
}

/// Percentage of `total_secs` covered by `watched_secs`, rounded half
/// away from zero and clamped to 100. Callers guarantee a non-zero total.
pub fn completion_percent(watched_secs: i64, total_secs: i64) -> i16 {
    let ratio = Decimal::from(watched_secs) * Decimal::from(100) / Decimal::from(total_secs);
    let rounded = ratio
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0);
    rounded.min(100).max(0) as i16
}

fn model_to_response(model: progress::Model) -> ProgressResponse {
    ProgressResponse {
        id: model.id,
        user_id: model.user_id,
        course_id: model.course_id,
        watched_time_secs: model.watched_time_secs,
        progress: model.progress,
    }
}
