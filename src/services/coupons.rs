use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::coupon::{self, Entity as Coupon},
    errors::ServiceError,
};

/// Why a coupon snapshot failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponIssue {
    Expired,
    Exhausted,
    NotApplicable,
}

impl From<CouponIssue> for ServiceError {
    fn from(issue: CouponIssue) -> Self {
        let message = match issue {
            CouponIssue::Expired => "Coupon has expired",
            CouponIssue::Exhausted => "Coupon has reached its maximum number of uses",
            CouponIssue::NotApplicable => "Coupon is not valid for this course",
        };
        ServiceError::InvalidInput(message.to_string())
    }
}

/// Point-in-time validity check against a coupon snapshot. Pure, so the
/// rules are testable without a database.
pub fn check_coupon(
    coupon: &coupon::Model,
    course_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), CouponIssue> {
    if coupon.expires_at < now {
        return Err(CouponIssue::Expired);
    }
    if let Some(max) = coupon.maximum_uses {
        if coupon.uses >= max {
            return Err(CouponIssue::Exhausted);
        }
    }
    if coupon.course_id != course_id {
        return Err(CouponIssue::NotApplicable);
    }
    Ok(())
}

#[derive(Debug, Clone, serde::Deserialize, validator::Validate, utoipa::ToSchema)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64, message = "Coupon code is required"))]
    pub code: String,
    /// Percentage discount in [0, 100]
    pub discount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub maximum_uses: Option<i32>,
    pub course_id: Uuid,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates a coupon. The discount percentage is validated into
    /// [0, 100] here so the pricing code can assume it.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_coupon(
        &self,
        request: CreateCouponRequest,
    ) -> Result<coupon::Model, ServiceError> {
        use validator::Validate;
        request.validate()?;

        if request.discount < dec!(0) || request.discount > dec!(100) {
            return Err(ServiceError::InvalidInput(
                "Coupon discount must be between 0 and 100 percent".to_string(),
            ));
        }
        if request.expires_at <= Utc::now() {
            return Err(ServiceError::InvalidInput(
                "Coupon expiry must be in the future".to_string(),
            ));
        }
        if matches!(request.maximum_uses, Some(max) if max <= 0) {
            return Err(ServiceError::InvalidInput(
                "Coupon maximum uses must be positive".to_string(),
            ));
        }

        let existing = Coupon::find()
            .filter(coupon::Column::Code.eq(request.code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                request.code
            )));
        }

        let code = request.code.clone();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(request.code),
            discount: Set(request.discount),
            expires_at: Set(request.expires_at),
            maximum_uses: Set(request.maximum_uses),
            uses: Set(0),
            course_id: Set(request.course_id),
            created_at: Set(Utc::now()),
        };
        // The existence pre-check races with concurrent creates; the
        // unique index on the code decides, surfaced as a conflict.
        let created = match model.insert(&*self.db).await {
            Ok(created) => created,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ServiceError::Conflict(format!(
                    "Coupon code {} already exists",
                    code
                )));
            }
            Err(e) => return Err(e.into()),
        };
        info!(coupon_id = %created.id, "Coupon created");
        Ok(created)
    }

    /// Finds a coupon by code and checks it against the target course.
    /// The caller applies the discount and, only after the consuming
    /// transaction is durably created, redeems the coupon once.
    #[instrument(skip(self))]
    pub async fn validate_for_course(
        &self,
        code: &str,
        course_id: Uuid,
    ) -> Result<coupon::Model, ServiceError> {
        let coupon = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

        check_coupon(&coupon, course_id, Utc::now())?;
        Ok(coupon)
    }

    /// Increments `uses` by exactly one, atomically at the storage layer.
    /// The usage-cap guard rides in the UPDATE filter, so a redemption
    /// racing past the cap affects zero rows and fails without
    /// incrementing. Runs on the caller's connection so it shares the
    /// enrollment's transaction boundary.
    pub async fn redeem<C: ConnectionTrait>(
        &self,
        conn: &C,
        coupon_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = Coupon::update_many()
            .col_expr(
                coupon::Column::Uses,
                Expr::col(coupon::Column::Uses).add(1),
            )
            .filter(coupon::Column::Id.eq(coupon_id))
            .filter(
                Condition::any()
                    .add(coupon::Column::MaximumUses.is_null())
                    .add(
                        Expr::col(coupon::Column::Uses)
                            .lt(Expr::col(coupon::Column::MaximumUses)),
                    ),
            )
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(CouponIssue::Exhausted.into());
        }
        Ok(())
    }

    pub async fn get_by_code(&self, code: &str) -> Result<coupon::Model, ServiceError> {
        Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))
    }

    pub async fn list_for_course(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<coupon::Model>, ServiceError> {
        Ok(Coupon::find()
            .filter(coupon::Column::CourseId.eq(course_id))
            .all(&*self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn snapshot(expires_in: Duration, maximum_uses: Option<i32>, uses: i32) -> coupon::Model {
        coupon::Model {
            id: Uuid::new_v4(),
            code: "SAVE20".to_string(),
            discount: dec!(20),
            expires_at: Utc::now() + expires_in,
            maximum_uses,
            uses,
            course_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_coupon_passes() {
        let coupon = snapshot(Duration::days(7), Some(10), 3);
        assert_matches!(check_coupon(&coupon, coupon.course_id, Utc::now()), Ok(()));
    }

    #[test]
    fn expired_coupon_is_rejected() {
        let coupon = snapshot(Duration::days(-1), None, 0);
        assert_matches!(
            check_coupon(&coupon, coupon.course_id, Utc::now()),
            Err(CouponIssue::Expired)
        );
    }

    #[test]
    fn exhausted_coupon_is_rejected_at_the_cap() {
        let coupon = snapshot(Duration::days(7), Some(5), 5);
        assert_matches!(
            check_coupon(&coupon, coupon.course_id, Utc::now()),
            Err(CouponIssue::Exhausted)
        );
    }

    #[test]
    fn unlimited_coupon_ignores_use_count() {
        let coupon = snapshot(Duration::days(7), None, 1_000_000);
        assert_matches!(check_coupon(&coupon, coupon.course_id, Utc::now()), Ok(()));
    }

    #[test]
    fn coupon_for_another_course_is_rejected() {
        let coupon = snapshot(Duration::days(7), None, 0);
        assert_matches!(
            check_coupon(&coupon, Uuid::new_v4(), Utc::now()),
            Err(CouponIssue::NotApplicable)
        );
    }

    #[test]
    fn expiry_wins_over_exhaustion() {
        // Both expired and exhausted: expiry is reported first.
        let coupon = snapshot(Duration::days(-1), Some(1), 1);
        assert_matches!(
            check_coupon(&coupon, coupon.course_id, Utc::now()),
            Err(CouponIssue::Expired)
        );
    }
}
