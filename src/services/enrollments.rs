use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::SETTLEMENT_CURRENCY,
    db::DbPool,
    entities::{
        course::{self, Entity as Course},
        course_enrollment::{self, Entity as CourseEnrollment},
        transaction::{self, Entity as Transaction, TransactionStatus},
        user::{self, Entity as User},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        coupons::CouponService,
        notifications::{EmailNotification, NotificationSender},
        pricing::{
            apply_discount, convert_to_settlement, profit_breakdown, to_settlement_units,
            SharedRates,
        },
    },
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTransactionRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[validate(length(min = 5, max = 20, message = "Phone number is required"))]
    pub phone_number: String,
    pub coupon_code: Option<String>,
    /// When true the transaction is created directly in the Approved
    /// state and enrollment takes effect immediately. When false it is
    /// created Pending for manual receipt review.
    #[serde(default)]
    pub auto_approve: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub phone_number: String,
    pub course_price_amount: Decimal,
    pub course_price_currency: String,
    /// Amount actually paid, in settlement-currency units.
    pub amount: i64,
    pub currency: String,
    pub discount_amount: i64,
    pub coupon_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub enrolled: bool,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentOutcome {
    pub transaction: TransactionResponse,
    /// Size of the course's enrolled-users set after the operation.
    pub enrolled_students: u64,
}

/// The enrollment ledger. Creates, approves and rejects enrollment
/// transactions, and owns the profit accumulators on Course and User.
///
/// All side effects of one operation share a single database transaction
/// so a failure cannot leave profits, the enrolled set and the ledger
/// entry out of step. The immediate-approval and manual-review flows
/// converge on one idempotent effects function keyed by the
/// course_enrollments primary key.
#[derive(Clone)]
pub struct EnrollmentService {
    db: Arc<DbPool>,
    rates: SharedRates,
    coupons: CouponService,
    notifier: Arc<dyn NotificationSender>,
    event_sender: Option<Arc<EventSender>>,
}

impl EnrollmentService {
    pub fn new(
        db: Arc<DbPool>,
        rates: SharedRates,
        coupons: CouponService,
        notifier: Arc<dyn NotificationSender>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            rates,
            coupons,
            notifier,
            event_sender,
        }
    }

    /// Creates an enrollment transaction.
    ///
    /// Pricing happens in the course's native currency first (coupon
    /// discount), then converts to the settlement currency, then rounds
    /// to integer units for the ledger entry.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, course_id = %request.course_id))]
    pub async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<EnrollmentOutcome, ServiceError> {
        request.validate()?;

        if self
            .find_enrollment(request.user_id, request.course_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "You are already enrolled in this course".to_string(),
            ));
        }

        let course = Course::find_by_id(request.course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Course {} not found", request.course_id))
            })?;
        let user = User::find_by_id(request.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("User {} not found", request.user_id))
            })?;

        let coupon = match &request.coupon_code {
            Some(code) => Some(self.coupons.validate_for_course(code, course.id).await?),
            None => None,
        };

        // Discount in the native currency, before conversion.
        let (discounted_native, discount_native) = match &coupon {
            Some(coupon) => {
                let result = apply_discount(course.price_amount, coupon.discount);
                (result.discounted, result.discount_amount)
            }
            None => (course.price_amount, Decimal::ZERO),
        };
        let amount = to_settlement_units(convert_to_settlement(
            &*self.rates,
            discounted_native,
            &course.price_currency,
        ));
        let discount_amount = to_settlement_units(convert_to_settlement(
            &*self.rates,
            discount_native,
            &course.price_currency,
        ));

        let status = if request.auto_approve {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Pending
        };

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let record = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            course_id: Set(course.id),
            phone_number: Set(request.phone_number.clone()),
            course_price_amount: Set(course.price_amount),
            course_price_currency: Set(course.price_currency.clone()),
            amount: Set(amount),
            discount_amount: Set(discount_amount),
            coupon_id: Set(coupon.as_ref().map(|c| c.id)),
            status: Set(status.clone()),
            enrolled: Set(request.auto_approve),
            rejection_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if request.auto_approve {
            let applied = self.apply_enrollment_effects(&txn, &record).await?;
            if !applied {
                // A concurrent enrollment won the race; roll everything
                // back so the duplicate leaves no trace.
                txn.rollback().await?;
                return Err(ServiceError::Conflict(
                    "You are already enrolled in this course".to_string(),
                ));
            }
        }
        txn.commit().await?;

        info!(transaction_id = %record.id, status = ?record.status, "Transaction created");

        if request.auto_approve {
            self.notify_enrollment(&user, &course, &record).await;
            self.emit(Event::EnrollmentApproved {
                transaction_id: record.id,
                user_id: user.id,
                course_id: course.id,
            })
            .await;
        } else {
            self.emit(Event::EnrollmentCreated {
                transaction_id: record.id,
                user_id: user.id,
                course_id: course.id,
            })
            .await;
        }

        let enrolled_students = self.enrolled_count(course.id).await?;
        Ok(EnrollmentOutcome {
            transaction: model_to_response(record),
            enrolled_students,
        })
    }

    /// Approves a pending transaction and applies the enrollment side
    /// effects. Re-approving an already approved transaction is a no-op
    /// with a warning; a rejected transaction cannot be approved. A
    /// pending transaction for a pair that was enrolled through another
    /// transaction in the meantime is rejected rather than approved, so
    /// at most one ledger entry per (user, course) ever ends Approved.
    #[instrument(skip(self))]
    pub async fn approve_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<EnrollmentOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        // Compare-and-set on status so two concurrent approvals cannot
        // both observe Pending.
        let moved = Transaction::update_many()
            .col_expr(
                transaction::Column::Status,
                Expr::value(TransactionStatus::Approved),
            )
            .col_expr(transaction::Column::Enrolled, Expr::value(true))
            .col_expr(transaction::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(transaction::Column::Id.eq(transaction_id))
            .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
            .exec(&txn)
            .await?
            .rows_affected;

        let record = Transaction::find_by_id(transaction_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        if moved == 0 {
            return match record.status {
                TransactionStatus::Approved => {
                    warn!(transaction_id = %transaction_id, "Transaction already approved; skipping");
                    txn.commit().await?;
                    let enrolled_students = self.enrolled_count(record.course_id).await?;
                    Ok(EnrollmentOutcome {
                        transaction: model_to_response(record),
                        enrolled_students,
                    })
                }
                _ => Err(ServiceError::InvalidOperation(
                    "Only pending transactions can be approved".to_string(),
                )),
            };
        }

        let applied = self.apply_enrollment_effects(&txn, &record).await?;
        if !applied {
            // Another ledger entry already enrolled this pair. This one
            // must not end up Approved alongside it, so it is rejected
            // in the same transaction that flipped its status.
            let reason = "User is already enrolled in this course".to_string();
            Transaction::update_many()
                .col_expr(
                    transaction::Column::Status,
                    Expr::value(TransactionStatus::Rejected),
                )
                .col_expr(transaction::Column::Enrolled, Expr::value(false))
                .col_expr(
                    transaction::Column::RejectionReason,
                    Expr::value(Some(reason.clone())),
                )
                .col_expr(transaction::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(transaction::Column::Id.eq(transaction_id))
                .exec(&txn)
                .await?;
            txn.commit().await?;

            warn!(
                transaction_id = %transaction_id,
                "Approval refused: user already enrolled through another transaction"
            );
            self.emit(Event::EnrollmentRejected {
                transaction_id,
                reason: Some(reason.clone()),
            })
            .await;
            return Err(ServiceError::Conflict(reason));
        }
        txn.commit().await?;

        let course = Course::find_by_id(record.course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Course {} not found", record.course_id))
            })?;
        let user = User::find_by_id(record.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", record.user_id)))?;

        info!(transaction_id = %transaction_id, "Transaction approved");
        self.notify_enrollment(&user, &course, &record).await;
        self.emit(Event::EnrollmentApproved {
            transaction_id,
            user_id: user.id,
            course_id: course.id,
        })
        .await;

        let record = Transaction::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;
        let enrolled_students = self.enrolled_count(record.course_id).await?;
        Ok(EnrollmentOutcome {
            transaction: model_to_response(record),
            enrolled_students,
        })
    }

    /// Rejects a pending transaction. No side effects on Course or User.
    #[instrument(skip(self))]
    pub async fn reject_transaction(
        &self,
        transaction_id: Uuid,
        reason: Option<String>,
    ) -> Result<TransactionResponse, ServiceError> {
        let moved = Transaction::update_many()
            .col_expr(
                transaction::Column::Status,
                Expr::value(TransactionStatus::Rejected),
            )
            .col_expr(
                transaction::Column::RejectionReason,
                Expr::value(reason.clone()),
            )
            .col_expr(transaction::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(transaction::Column::Id.eq(transaction_id))
            .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
            .exec(&*self.db)
            .await?
            .rows_affected;

        let record = Transaction::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        if moved == 0 {
            return Err(ServiceError::InvalidOperation(
                "Only pending transactions can be rejected".to_string(),
            ));
        }

        info!(transaction_id = %transaction_id, "Transaction rejected");
        self.emit(Event::EnrollmentRejected {
            transaction_id,
            reason,
        })
        .await;

        Ok(model_to_response(record))
    }

    /// Lists transactions awaiting manual review, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<TransactionResponse>, ServiceError> {
        let records = Transaction::find()
            .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
            .order_by_asc(transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(records.into_iter().map(model_to_response).collect())
    }

    pub async fn get_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<TransactionResponse, ServiceError> {
        let record = Transaction::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;
        Ok(model_to_response(record))
    }

    /// All transactions of one user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TransactionResponse>, ServiceError> {
        let records = Transaction::find()
            .filter(transaction::Column::UserId.eq(user_id))
            .order_by_desc(transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(records.into_iter().map(model_to_response).collect())
    }

    /// Applies the enrollment side effects for an approved transaction:
    /// membership in the enrolled-users set, profit attribution to the
    /// course and its instructor off the list price, and the one-time
    /// coupon redemption.
    ///
    /// Idempotent: the insert into `course_enrollments` is keyed on
    /// (course, user) with DO NOTHING, so calling this twice for the
    /// same pair applies nothing the second time and returns `false`.
    async fn apply_enrollment_effects<C: ConnectionTrait>(
        &self,
        conn: &C,
        record: &transaction::Model,
    ) -> Result<bool, ServiceError> {
        let membership = course_enrollment::ActiveModel {
            course_id: Set(record.course_id),
            user_id: Set(record.user_id),
            transaction_id: Set(record.id),
            enrolled_at: Set(Utc::now()),
        };
        let inserted = CourseEnrollment::insert(membership)
            .on_conflict(
                OnConflict::columns([
                    course_enrollment::Column::CourseId,
                    course_enrollment::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(conn)
            .await;
        match inserted {
            Ok(_) => {}
            Err(DbErr::RecordNotInserted) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let course = Course::find_by_id(record.course_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Course {} not found", record.course_id))
            })?;
        let instructor = User::find_by_id(course.instructor_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Instructor {} not found", course.instructor_id))
            })?;

        let list_price_settlement =
            convert_to_settlement(&*self.rates, course.price_amount, &course.price_currency);
        let split = profit_breakdown(list_price_settlement, instructor.platform_fee);

        Course::update_many()
            .col_expr(
                course::Column::Profits,
                Expr::col(course::Column::Profits).add(split.course_share),
            )
            .filter(course::Column::Id.eq(course.id))
            .exec(conn)
            .await?;
        User::update_many()
            .col_expr(
                user::Column::Profits,
                Expr::col(user::Column::Profits).add(split.instructor_share),
            )
            .filter(user::Column::Id.eq(instructor.id))
            .exec(conn)
            .await?;

        if let Some(coupon_id) = record.coupon_id {
            self.coupons.redeem(conn, coupon_id).await?;
        }

        Ok(true)
    }

    async fn find_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<course_enrollment::Model>, ServiceError> {
        Ok(CourseEnrollment::find_by_id((course_id, user_id))
            .one(&*self.db)
            .await?)
    }

    async fn enrolled_count(&self, course_id: Uuid) -> Result<u64, ServiceError> {
        Ok(CourseEnrollment::find()
            .filter(course_enrollment::Column::CourseId.eq(course_id))
            .count(&*self.db)
            .await?)
    }

    /// Best-effort confirmation email. Failures are logged and swallowed
    /// so a mailer outage never rolls back an enrollment.
    async fn notify_enrollment(
        &self,
        user: &user::Model,
        course: &course::Model,
        record: &transaction::Model,
    ) {
        let note = EmailNotification {
            to: user.email.clone(),
            subject: "Course Enrollment Confirmation".to_string(),
            template: "enrollment-confirmation".to_string(),
            data: json!({
                "course_title": course.title,
                "amount": record.amount,
                "currency": SETTLEMENT_CURRENCY,
            }),
        };
        if let Err(e) = self.notifier.send(note).await {
            warn!(error = %e, user_id = %user.id, "Failed to send enrollment confirmation email");
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send enrollment event");
            }
        }
    }
}

fn model_to_response(model: transaction::Model) -> TransactionResponse {
    TransactionResponse {
        id: model.id,
        user_id: model.user_id,
        course_id: model.course_id,
        phone_number: model.phone_number,
        course_price_amount: model.course_price_amount,
        course_price_currency: model.course_price_currency,
        amount: model.amount,
        currency: SETTLEMENT_CURRENCY.to_string(),
        discount_amount: model.discount_amount,
        coupon_id: model.coupon_id,
        status: model.status,
        enrolled: model.enrolled,
        rejection_reason: model.rejection_reason,
        created_at: model.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn response_keeps_the_settlement_currency() {
        let now = Utc::now();
        let model = transaction::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            phone_number: "0100000000".to_string(),
            course_price_amount: dec!(100),
            course_price_currency: "USD".to_string(),
            amount: 4043,
            discount_amount: 1011,
            coupon_id: None,
            status: TransactionStatus::Approved,
            enrolled: true,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };

        let response = model_to_response(model);
        assert_eq!(response.currency, "EGP");
        assert_eq!(response.amount, 4043);
        assert_eq!(response.course_price_currency, "USD");
    }
}
