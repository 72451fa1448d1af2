//! Coercion of raw line items into storable rows.
//!
//! Normalization never fails. Malformed numbers fall back to defaults
//! (quantity 1, unit price 0) and rows whose description is blank are
//! dropped. The creation path is stricter: it rejects blank descriptions
//! during request validation, before this module ever sees the items.
//! Updates rely on the dropping behaviour instead.

use rust_decimal::Decimal;

use crate::documents::totals::line_total;
use crate::documents::types::{RawItem, RawNumber};
use crate::models::NewLineItem;

/// Normalizes every row, dropping those without a description.
pub fn normalize(raw_items: &[RawItem]) -> Vec<NewLineItem> {
    raw_items.iter().filter_map(normalize_item).collect()
}

/// Normalizes one row, or `None` when its description is blank.
pub fn normalize_item(raw: &RawItem) -> Option<NewLineItem> {
    let description = raw.description.trim();
    if description.is_empty() {
        return None;
    }

    let quantity = parse_quantity(raw.quantity.as_ref());
    let unit_price = parse_unit_price(raw.unit_price.as_ref());

    Some(NewLineItem {
        description: description.to_string(),
        quantity,
        unit_price,
        total: line_total(quantity, unit_price),
    })
}

/// `floor(max(1, q))`, with unparsable input counting as 1.
pub fn parse_quantity(value: Option<&RawNumber>) -> i64 {
    let quantity = value.and_then(RawNumber::as_f64).unwrap_or(1.0);
    // `as` saturates on out-of-range floats
    quantity.max(1.0).floor() as i64
}

/// Non-negative unit price, with unparsable or negative input counting as 0.
/// Prices past the `Decimal` range saturate rather than counting as 0.
pub fn parse_unit_price(value: Option<&RawNumber>) -> Decimal {
    value
        .and_then(RawNumber::to_decimal)
        .filter(|price| !price.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn raw(description: &str, quantity: RawNumber, unit_price: RawNumber) -> RawItem {
        RawItem {
            description: description.to_string(),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
        }
    }

    #[test]
    fn test_quantity_clamping() {
        let inputs = [
            RawNumber::Number(0.0),
            RawNumber::Number(-5.0),
            RawNumber::Number(0.4),
            RawNumber::Text("abc".to_string()),
            RawNumber::Number(3.9),
        ];
        let quantities: Vec<i64> = inputs.iter().map(|q| parse_quantity(Some(q))).collect();
        assert_eq!(quantities, vec![1, 1, 1, 1, 3]);
    }

    #[test]
    fn test_missing_and_non_finite_quantity_default_to_one() {
        assert_eq!(parse_quantity(None), 1);
        assert_eq!(parse_quantity(Some(&RawNumber::Text("inf".to_string()))), 1);
        assert_eq!(parse_quantity(Some(&RawNumber::Text(" 7.2 ".to_string()))), 7);
    }

    #[test]
    fn test_unit_price_defaults() {
        assert_eq!(parse_unit_price(None), Decimal::ZERO);
        assert_eq!(parse_unit_price(Some(&RawNumber::Number(-3.0))), Decimal::ZERO);
        assert_eq!(parse_unit_price(Some(&RawNumber::Text("n/a".to_string()))), Decimal::ZERO);
        assert_eq!(parse_unit_price(Some(&RawNumber::Text("12.50".to_string()))), dec("12.50"));
    }

    #[test]
    fn test_oversized_price_is_not_zeroed() {
        let item = normalize_item(&raw("Huge", RawNumber::Number(2.0), RawNumber::Number(1e30))).unwrap();
        assert_eq!(item.unit_price, Decimal::MAX);
        assert_eq!(item.total, Decimal::MAX);
    }

    #[test]
    fn test_blank_descriptions_are_dropped_and_others_trimmed() {
        let items = normalize(&[
            raw("", RawNumber::Number(2.0), RawNumber::Number(5.0)),
            raw("  Valve  ", RawNumber::Number(1.0), RawNumber::Number(10.0)),
            raw("   ", RawNumber::Number(1.0), RawNumber::Number(1.0)),
        ]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Valve");
        assert_eq!(items[0].total, dec("10.00"));
    }

    #[test]
    fn test_line_total_is_rounded() {
        let item = normalize_item(&raw(
            "Gasket",
            RawNumber::Number(3.0),
            RawNumber::Number(19.995),
        ))
        .unwrap();

        assert_eq!(item.quantity, 3);
        assert_eq!(item.unit_price, dec("19.995"));
        assert_eq!(item.total, dec("59.99"));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let input = vec![
            raw("A", RawNumber::Text("2.7".to_string()), RawNumber::Text("3.333".to_string())),
            raw("B", RawNumber::Number(1.0), RawNumber::Number(0.1)),
        ];
        assert_eq!(normalize(&input), normalize(&input));
    }
}
