//! Currency rounding
//!
//! Fees round half away from zero to whole cents. Callers round each
//! component (base after modifiers, add-on) before summing; rounding only
//! the final sum can differ by a cent at .xx5 boundaries.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a dollar amount to cents, half away from zero
///
/// ```
/// use feeplan_core::money::round_cents;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round_cents(dec!(169.296)), dec!(169.30));
/// assert_eq!(round_cents(dec!(0.005)), dec!(0.01));
/// ```
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format as "$1,234.56" for terminal output
pub fn format_dollars(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, cents)
}
