use std::num::IntErrorKind;

use num_format::{Locale, ToFormattedString};

/// Units of currency the rate is quoted for
pub const RATE_UNIT: u128 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AmountError {
    #[error("not a number")]
    NotANumber,
    #[error("amount must be positive")]
    NotPositive,
    #[error("amount does not fit in 128 bits")]
    TooLarge,
}

/// USD price of [`RATE_UNIT`] units of in-game currency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate(f64);

impl Rate {
    pub fn new(usd_per_unit: f64) -> Option<Self> {
        (usd_per_unit.is_finite() && usd_per_unit > 0.0).then_some(Self(usd_per_unit))
    }

    pub fn usd_per_unit(&self) -> f64 {
        self.0
    }

    /// Cost of `amount` units, rounded to cents
    pub fn usd(&self, amount: u128) -> f64 {
        let raw = (amount as f64 / RATE_UNIT as f64) * self.0;
        (raw * 100.0).round() / 100.0
    }

    /// `$7.00`
    pub fn display(&self) -> String {
        format_usd(self.0)
    }

    /// `$7`, or `$7.50` when the rate has cents
    pub fn compact(&self) -> String {
        if self.0.fract() == 0.0 {
            format!("${:.0}", self.0)
        } else {
            format_usd(self.0)
        }
    }

    /// `1,000 ÷ 1,000 × $7 = $7.00`
    pub fn breakdown(&self, amount: u128) -> String {
        format!(
            "{} ÷ {} × {} = {}",
            format_amount(amount),
            format_amount(RATE_UNIT),
            self.compact(),
            format_usd(self.usd(amount)),
        )
    }
}

pub fn format_usd(value: f64) -> String {
    format!("${:.2}", value)
}

pub fn format_amount(amount: u128) -> String {
    amount.to_formatted_string(&Locale::en)
}

/// Reads a whole amount, ignoring thousands separators
pub fn parse_amount(text: &str) -> Result<u128, AmountError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<i128>() {
        Ok(amount) if amount > 0 => Ok(amount.unsigned_abs()),
        Ok(_) => Err(AmountError::NotPositive),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Err(AmountError::TooLarge),
            IntErrorKind::NegOverflow => Err(AmountError::NotPositive),
            _ => Err(AmountError::NotANumber),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seven() -> Rate {
        Rate::new(7.0).unwrap()
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(Rate::new(0.0).is_none());
        assert!(Rate::new(-1.0).is_none());
        assert!(Rate::new(f64::NAN).is_none());
        assert!(Rate::new(f64::INFINITY).is_none());
    }

    #[test]
    fn prices_a_thousand_at_the_rate() {
        assert_eq!(seven().usd(1000), 7.0);
        assert_eq!(seven().usd(2500), 17.5);
        assert_eq!(seven().usd(1), 0.01);
    }

    #[test]
    fn formats_rate_both_ways() {
        assert_eq!(seven().display(), "$7.00");
        assert_eq!(seven().compact(), "$7");
        let cents = Rate::new(6.5).unwrap();
        assert_eq!(cents.display(), "$6.50");
        assert_eq!(cents.compact(), "$6.50");
    }

    #[test]
    fn breakdown_reads_like_arithmetic() {
        assert_eq!(seven().breakdown(1000), "1,000 ÷ 1,000 × $7 = $7.00");
        assert_eq!(seven().breakdown(12500), "12,500 ÷ 1,000 × $7 = $87.50");
    }

    #[test]
    fn parses_amounts() {
        assert_eq!(parse_amount("1000"), Ok(1000));
        assert_eq!(parse_amount("1,000"), Ok(1000));
        assert_eq!(parse_amount(" 25,000 "), Ok(25000));
        assert_eq!(parse_amount("-5"), Err(AmountError::NotPositive));
        assert_eq!(parse_amount("0"), Err(AmountError::NotPositive));
        assert_eq!(parse_amount("abc"), Err(AmountError::NotANumber));
        assert_eq!(parse_amount("12.5"), Err(AmountError::NotANumber));
        assert_eq!(parse_amount(""), Err(AmountError::NotANumber));
    }

    #[test]
    fn prices_amounts_past_64_bits() {
        assert_eq!(parse_amount("10000000000000000000"), Ok(10_000_000_000_000_000_000));
        assert_eq!(parse_amount("99,999,999,999,999,999,999"), Ok(99_999_999_999_999_999_999));
        assert_eq!(seven().usd(10_000_000_000_000_000_000), 70_000_000_000_000_000.0);
        let beyond = "9".repeat(40);
        assert_eq!(parse_amount(&beyond), Err(AmountError::TooLarge));
        assert_eq!(parse_amount(&format!("-{}", beyond)), Err(AmountError::NotPositive));
    }

    proptest! {
        #[test]
        fn usd_never_decreases(a in 1u128..10_000_000, b in 1u128..10_000_000, cents in 1u32..100_000) {
            let rate = Rate::new(f64::from(cents) / 100.0).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rate.usd(lo) <= rate.usd(hi));
        }

        #[test]
        fn thousand_units_cost_the_rate(cents in 1u32..100_000) {
            let rate = Rate::new(f64::from(cents) / 100.0).unwrap();
            prop_assert_eq!(rate.usd(RATE_UNIT), rate.usd_per_unit());
        }

        #[test]
        fn separators_do_not_change_amounts(amount in 1u128..1_000_000_000_000) {
            prop_assert_eq!(parse_amount(&format_amount(amount)), Ok(amount));
        }
    }
}
