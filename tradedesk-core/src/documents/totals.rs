use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{NewLineItem, Totals};

/// Rounds to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Total of one line: `round2(quantity * unit_price)`.
pub fn line_total(quantity: i64, unit_price: Decimal) -> Decimal {
    round2(Decimal::from(quantity).saturating_mul(unit_price))
}

/// Computes subtotal, tax and total from normalized items.
pub fn aggregate(items: &[NewLineItem], tax_rate: Decimal) -> Totals {
    aggregate_line_totals(items.iter().map(|item| item.total), tax_rate)
}

/// Computes subtotal, tax and total from already rounded line totals.
///
/// Each figure is rounded on its own: the total is derived from the rounded
/// subtotal and rounded tax, never from unrounded intermediates.
pub fn aggregate_line_totals<I>(line_totals: I, tax_rate: Decimal) -> Totals
where
    I: IntoIterator<Item = Decimal>,
{
    let sum = line_totals
        .into_iter()
        .fold(Decimal::ZERO, |acc, total| acc.saturating_add(total));

    let subtotal = round2(sum);
    let tax_amount = round2(subtotal.saturating_mul(tax_rate) / Decimal::ONE_HUNDRED);
    let total = round2(subtotal.saturating_add(tax_amount));

    Totals {
        subtotal,
        tax_amount,
        total,
    }
}
