//! Property-based tests for money rounding and rate lookups.
//!
//! - Property 1: Rounding is idempotent and stays within half a cent
//! - Property 2: Rounding is symmetric around zero
//! - Property 3: Identity rates never reach the inner provider

use proptest::prelude::*;
use rust_decimal::Decimal;
use tripper_shared::types::{CurrencyCode, round_money};

use super::cache::CachedRateProvider;
use super::fixed::FixedRateProvider;
use super::rate::CurrencyRateProvider;
use super::testing::CountingProvider;

/// Strategy to generate signed amounts with up to 6 fractional digits.
fn any_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000_000i64..1_000_000_000_000i64).prop_map(|micros| Decimal::new(micros, 6))
}

/// Strategy to generate three-letter upper-case codes.
fn currency_code() -> impl Strategy<Value = CurrencyCode> {
    "[A-Z]{3}".prop_map(|raw| CurrencyCode::parse(&raw).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1.1: `round(round(x)) == round(x)`.
    #[test]
    fn prop_round_money_idempotent(amount in any_amount()) {
        let once = round_money(amount);
        prop_assert_eq!(round_money(once), once);
    }

    /// Property 1.2: the rounded value differs from the input by at most 0.005
    /// and carries at most two fractional digits.
    #[test]
    fn prop_round_money_within_half_cent(amount in any_amount()) {
        let rounded = round_money(amount);
        prop_assert!((rounded - amount).abs() <= Decimal::new(5, 3));
        let cents = rounded * Decimal::ONE_HUNDRED;
        prop_assert_eq!(cents, cents.trunc());
    }

    /// Property 2: `round(-x) == -round(x)` (half away from zero is symmetric).
    #[test]
    fn prop_round_money_symmetric(amount in any_amount()) {
        prop_assert_eq!(round_money(-amount), -round_money(amount));
    }

    /// Property 3: `get_rate(X, X) == 1` without invoking the wrapped provider.
    #[test]
    fn prop_identity_rate_skips_lookup(code in currency_code()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let inner = std::sync::Arc::new(CountingProvider::new(FixedRateProvider::new()));
        let cached = CachedRateProvider::new(std::sync::Arc::clone(&inner));

        let direct = runtime.block_on(inner.get_rate(code, code));
        let via_cache = runtime.block_on(cached.get_rate(code, code));

        prop_assert_eq!(direct, Ok(Decimal::ONE));
        prop_assert_eq!(via_cache, Ok(Decimal::ONE));
        // Only the direct call above reached the counting provider.
        prop_assert_eq!(inner.calls(), 1);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Specific example: the midpoint goes away from zero, not to even.
    #[test]
    fn test_midpoint_is_not_bankers() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(0.135)), dec!(0.14));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
    }

    /// Specific example: 100 / 3 rounds to 33.33.
    #[test]
    fn test_one_hundred_split_three_ways() {
        assert_eq!(round_money(dec!(100) / dec!(3)), dec!(33.33));
    }
}
