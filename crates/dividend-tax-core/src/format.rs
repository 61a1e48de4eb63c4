use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Money;

/// Decimal places shown for every amount.
pub const DISPLAY_DP: u32 = 2;

/// Round for display. Applied once, to exact figures; never fed back into
/// arithmetic.
pub fn round_amount(amount: Money) -> Money {
    amount.round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `1234.5` -> `"1234.50"`
pub fn format_amount(amount: Money) -> String {
    format!("{:.2}", round_amount(amount))
}

/// Display symbol for an ISO currency code; unknown codes are shown as-is.
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        other => other,
    }
}

/// Whole shares implied by a payment, `None` when the per-share amount is
/// zero.
pub fn shares_held(total: Money, dividend_per_share: Money) -> Option<Decimal> {
    if dividend_per_share.is_zero() {
        return None;
    }
    total
        .checked_div(dividend_per_share)
        .map(|shares| shares.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_pads_and_rounds_half_away() {
        assert_eq!(format_amount(dec!(1234.5)), "1234.50");
        assert_eq!(format_amount(dec!(309.825)), "309.83");
        assert_eq!(format_amount(dec!(-0.005)), "-0.01");
        assert_eq!(format_amount(dec!(10.8891)), "10.89");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_rounding_happens_on_exact_values() {
        // 0.004 + 0.004 would show 0.00 + 0.00 if rounded per row.
        let total = dec!(0.004) + dec!(0.004);
        assert_eq!(format_amount(total), "0.01");
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(currency_symbol("USD"), "$");
        assert_eq!(currency_symbol("EUR"), "€");
        assert_eq!(currency_symbol("GBP"), "GBP");
        assert_eq!(currency_symbol("N/A"), "N/A");
    }

    #[test]
    fn test_shares_held() {
        assert_eq!(shares_held(dec!(24.00), dec!(0.24)), Some(dec!(100)));
        assert_eq!(shares_held(dec!(10), dec!(0.3)), Some(dec!(33)));
        assert_eq!(shares_held(dec!(10), Decimal::ZERO), None);
    }
}
