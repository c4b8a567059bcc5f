use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        course::{self, Entity as Course},
        review::{self, Entity as Review},
    },
    errors::ServiceError,
};

/// Aggregate of a course's review set: (average rounded to one decimal,
/// count). An empty set aggregates to (0, 0).
pub fn aggregate_rates(rates: &[i16]) -> (Decimal, i32) {
    if rates.is_empty() {
        return (Decimal::ZERO, 0);
    }
    let sum: i64 = rates.iter().map(|r| *r as i64).sum();
    let avg = Decimal::from(sum) / Decimal::from(rates.len() as i64);
    (
        avg.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
        rates.len() as i32,
    )
}

/// Recomputes a course's `ratings_average` / `ratings_quantity` from
/// the full review set and writes both in one replacement UPDATE. No
/// other component writes those fields. Connection-generic so review
/// mutations run it inside their own database transaction; every
/// mutation path awaits it before returning, so the displayed rating
/// always equals the true aggregate by the time the request completes.
#[instrument(skip(conn))]
pub async fn recompute_on<C: ConnectionTrait>(
    conn: &C,
    course_id: Uuid,
) -> Result<(), ServiceError> {
    let rates: Vec<i16> = Review::find()
        .filter(review::Column::CourseId.eq(course_id))
        .select_only()
        .column(review::Column::Rate)
        .into_tuple()
        .all(conn)
        .await?;

    let (average, quantity) = aggregate_rates(&rates);
    debug!(course_id = %course_id, average = %average, quantity, "Course rating recomputed");

    Course::update_many()
        .col_expr(course::Column::RatingsAverage, Expr::value(average))
        .col_expr(course::Column::RatingsQuantity, Expr::value(quantity))
        .filter(course::Column::Id.eq(course_id))
        .exec(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn empty_review_set_resets_to_zero() {
        assert_eq!(aggregate_rates(&[]), (Decimal::ZERO, 0));
    }

    #[test_case(&[5, 4, 3], dec!(4.0), 3; "clean average")]
    #[test_case(&[5, 4], dec!(4.5), 2; "half kept at one decimal")]
    #[test_case(&[5, 5, 4], dec!(4.7), 3; "two thirds rounds to 4.7")]
    #[test_case(&[1], dec!(1.0), 1; "single minimum rating")]
    #[test_case(&[2, 2, 3], dec!(2.3), 3; "repeating decimal truncates to one place")]
    fn averages_round_to_one_decimal(rates: &[i16], avg: Decimal, count: i32) {
        assert_eq!(aggregate_rates(rates), (avg, count));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        // 26/6 = 4.333... -> 4.3
        assert_eq!(aggregate_rates(&[4, 5, 4, 5, 4, 4]).0, dec!(4.3));
        // 15/4 = 3.75 -> 3.8
        assert_eq!(aggregate_rates(&[3, 4, 4, 4]).0, dec!(3.8));
    }
}
