use super::*;
use rstest::rstest;
use rust_decimal_macros::dec;
use std::str::FromStr;

#[rstest]
#[case(dec!(0.005), dec!(0.01))]
#[case(dec!(-0.005), dec!(-0.01))]
#[case(dec!(0.004), dec!(0.00))]
#[case(dec!(2.675), dec!(2.68))]
#[case(dec!(2.665), dec!(2.67))]
#[case(dec!(33.333333), dec!(33.33))]
#[case(dec!(-33.335), dec!(-33.34))]
#[case(dec!(100), dec!(100))]
fn test_round_money_half_away_from_zero(#[case] input: Decimal, #[case] expected: Decimal) {
    assert_eq!(round_money(input), expected);
}

#[test]
fn test_round_money_is_idempotent() {
    let once = round_money(dec!(12.345));
    assert_eq!(round_money(once), once);
}

#[test]
fn test_currency_parse_normalizes() {
    assert_eq!(CurrencyCode::parse(" chf ").unwrap(), CurrencyCode::CHF);
    assert_eq!(CurrencyCode::parse("Eur").unwrap(), CurrencyCode::EUR);
    assert_eq!(CurrencyCode::from_str("usd").unwrap(), CurrencyCode::USD);
}

#[rstest]
#[case("")]
#[case("CH")]
#[case("CHFX")]
#[case("C1F")]
#[case("   ")]
#[case("€UR")]
fn test_currency_parse_rejects_malformed(#[case] raw: &str) {
    assert_eq!(
        CurrencyCode::parse(raw),
        Err(CurrencyError::Malformed(raw.to_string()))
    );
}

#[test]
fn test_currency_display() {
    assert_eq!(CurrencyCode::CHF.to_string(), "CHF");
    assert_eq!(format!("{:?}", CurrencyCode::EUR), "CurrencyCode(EUR)");
}

#[test]
fn test_currency_serde_roundtrip_normalizes() {
    let code: CurrencyCode = serde_json::from_str("\"gbp\"").unwrap();
    assert_eq!(code.as_str(), "GBP");
    assert_eq!(serde_json::to_string(&code).unwrap(), "\"GBP\"");
    assert!(serde_json::from_str::<CurrencyCode>("\"pounds\"").is_err());
}
