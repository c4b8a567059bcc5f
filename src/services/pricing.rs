use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SETTLEMENT_CURRENCY;

/// Fraction of every sale retained as taxes before profit attribution.
pub const TAX_RATE: Decimal = dec!(0.05);

/// Provides per-currency conversion rates into the settlement currency.
/// Injectable so tests can pin exchange rates deterministically.
pub trait RateProvider: Send + Sync {
    /// Rate multiplying an amount in `currency` into the settlement
    /// currency. The settlement currency has rate 1; unknown codes fall
    /// back to 1 (pass-through, documented behavior rather than a
    /// failure).
    fn rate(&self, currency: &str) -> Decimal;
}

/// Rate table loaded from configuration at startup.
#[derive(Debug, Clone)]
pub struct StaticRates {
    rates: HashMap<String, Decimal>,
}

impl StaticRates {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates }
    }
}

impl RateProvider for StaticRates {
    fn rate(&self, currency: &str) -> Decimal {
        self.rates.get(currency).copied().unwrap_or(Decimal::ONE)
    }
}

/// Converts `amount` denominated in `currency` into the settlement
/// currency, unrounded.
pub fn convert_to_settlement(rates: &dyn RateProvider, amount: Decimal, currency: &str) -> Decimal {
    if currency == SETTLEMENT_CURRENCY {
        return amount;
    }
    amount * rates.rate(currency)
}

/// Result of applying a percentage discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountedPrice {
    pub discounted: Decimal,
    pub discount_amount: Decimal,
}

/// Applies a percentage discount. `percent` is assumed to be in
/// [0, 100]; coupons are validated into that range at creation time.
pub fn apply_discount(amount: Decimal, percent: Decimal) -> DiscountedPrice {
    let discount_amount = amount * percent / dec!(100);
    DiscountedPrice {
        discounted: amount - discount_amount,
        discount_amount,
    }
}

/// Rounds a settlement-currency amount to the nearest integer unit,
/// half away from zero, before it is persisted on a ledger entry.
/// Integer units avoid fractional drift across many enrollments.
pub fn to_settlement_units(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Profit attribution for one enrollment, in settlement units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitBreakdown {
    pub taxes: i64,
    pub course_share: i64,
    pub instructor_share: i64,
}

/// Computes the profit split off the course's **list** price converted
/// to the settlement currency, not the discounted transaction price:
/// a discounted purchase still credits the full undiscounted profit to
/// course and instructor.
pub fn profit_breakdown(list_price_settlement: Decimal, platform_fee: Decimal) -> ProfitBreakdown {
    let taxes = to_settlement_units(list_price_settlement * TAX_RATE);
    let course_share = to_settlement_units(list_price_settlement - Decimal::from(taxes));
    let instructor_share = to_settlement_units(
        list_price_settlement - list_price_settlement * platform_fee - Decimal::from(taxes),
    );
    ProfitBreakdown {
        taxes,
        course_share,
        instructor_share,
    }
}

/// Convenience alias used throughout the services.
pub type SharedRates = Arc<dyn RateProvider>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn usd_rates() -> StaticRates {
        let mut map = HashMap::new();
        map.insert("USD".to_string(), dec!(50.54));
        map.insert("EGP".to_string(), dec!(1));
        StaticRates::new(map)
    }

    #[test]
    fn settlement_currency_passes_through() {
        let rates = usd_rates();
        assert_eq!(
            convert_to_settlement(&rates, dec!(250), "EGP"),
            dec!(250)
        );
    }

    #[test]
    fn usd_converts_at_the_table_rate() {
        let rates = usd_rates();
        assert_eq!(
            convert_to_settlement(&rates, dec!(100), "USD"),
            dec!(5054.00)
        );
    }

    #[test]
    fn unknown_currency_defaults_to_rate_one() {
        let rates = usd_rates();
        assert_eq!(convert_to_settlement(&rates, dec!(42), "XYZ"), dec!(42));
    }

    #[test]
    fn twenty_percent_discount_on_one_hundred() {
        let result = apply_discount(dec!(100), dec!(20));
        assert_eq!(result.discounted, dec!(80));
        assert_eq!(result.discount_amount, dec!(20));
    }

    #[test]
    fn zero_percent_discount_is_identity() {
        let result = apply_discount(dec!(59.99), dec!(0));
        assert_eq!(result.discounted, dec!(59.99));
        assert_eq!(result.discount_amount, dec!(0));
    }

    #[test_case(dec!(4043.2), 4043; "rounds down below half")]
    #[test_case(dec!(4043.5), 4044; "rounds half away from zero")]
    #[test_case(dec!(252.7), 253; "rounds up above half")]
    #[test_case(dec!(0), 0; "zero stays zero")]
    fn settlement_unit_rounding(amount: Decimal, expected: i64) {
        assert_eq!(to_settlement_units(amount), expected);
    }

    #[test]
    fn discounted_usd_price_settles_to_4043() {
        // 100 USD at rate 50.54 with a 20% coupon: 80 USD -> 4043.2 -> 4043.
        let rates = usd_rates();
        let discounted = apply_discount(dec!(100), dec!(20)).discounted;
        let settlement = convert_to_settlement(&rates, discounted, "USD");
        assert_eq!(settlement, dec!(4043.200));
        assert_eq!(to_settlement_units(settlement), 4043);
    }

    #[test]
    fn profit_split_uses_the_list_price() {
        // List price 100 USD -> 5054 settlement. Taxes round(252.7) = 253,
        // course share round(5054 - 253) = 4801, instructor at 10% fee
        // round(5054 - 505.4 - 253) = 4296.
        let breakdown = profit_breakdown(dec!(5054), dec!(0.10));
        assert_eq!(breakdown.taxes, 253);
        assert_eq!(breakdown.course_share, 4801);
        assert_eq!(breakdown.instructor_share, 4296);
    }

    #[test]
    fn zero_platform_fee_credits_everything_but_taxes() {
        let breakdown = profit_breakdown(dec!(1000), dec!(0));
        assert_eq!(breakdown.taxes, 50);
        assert_eq!(breakdown.course_share, 950);
        assert_eq!(breakdown.instructor_share, 950);
    }
}
