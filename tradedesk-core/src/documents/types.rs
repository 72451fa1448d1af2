use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Largest amount a `NUMERIC(14, 2)` column can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// A number as clients send it: a JSON number or a numeric string.
///
/// Anything else (objects, arrays, booleans) fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RawNumber::Number(n) => *n,
            RawNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Exact decimal value. Numbers go through their shortest textual form so
    /// `19.995` stays `19.995` instead of its binary approximation.
    ///
    /// Finite values beyond the `Decimal` range saturate to `Decimal::MAX`
    /// (or `MIN`) so that bounds checks still see them.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let parsed = match self {
            RawNumber::Number(n) if n.is_finite() => parse_decimal(&n.to_string()),
            RawNumber::Number(_) => None,
            RawNumber::Text(s) => parse_decimal(s.trim()),
        };
        parsed.or_else(|| match self.as_f64()? {
            n if n >= DECIMAL_RANGE => Some(Decimal::MAX),
            n if n <= -DECIMAL_RANGE => Some(Decimal::MIN),
            _ => None,
        })
    }
}

/// Magnitude past which an `f64` no longer fits a `Decimal`.
const DECIMAL_RANGE: f64 = 7.9e28;

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// One candidate line item as submitted by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RawItem {
    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,

    #[serde(default)]
    pub quantity: Option<RawNumber>,

    #[serde(default)]
    pub unit_price: Option<RawNumber>,
}

impl RawItem {
    pub fn new(description: &str, quantity: f64, unit_price: f64) -> Self {
        RawItem {
            description: description.to_string(),
            quantity: Some(RawNumber::Number(quantity)),
            unit_price: Some(RawNumber::Number(unit_price)),
        }
    }
}

/// Quote or invoice creation request.
///
/// `valid_until` is accepted as a synonym of `due_date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    #[validate(required(message = "Client is required"))]
    pub client_id: Option<Uuid>,

    #[serde(default)]
    #[validate(required(message = "Date is required"))]
    pub date: Option<NaiveDate>,

    #[serde(default, alias = "valid_until")]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Decimal,

    #[serde(default)]
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<RawItem>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Items and/or totals replacement.
///
/// With a non-empty `items` list the totals are always recomputed and the
/// explicit amounts are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReplaceItemsRequest {
    #[serde(default)]
    pub items: Option<Vec<RawItem>>,

    #[serde(default)]
    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Option<Decimal>,

    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub subtotal: Option<Decimal>,

    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub tax_amount: Option<Decimal>,

    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub total: Option<Decimal>,
}

impl ReplaceItemsRequest {
    pub fn has_items(&self) -> bool {
        self.items.as_ref().is_some_and(|items| !items.is_empty())
    }

    pub fn has_explicit_totals(&self) -> bool {
        self.subtotal.is_some() || self.tax_amount.is_some() || self.total.is_some()
    }
}

/// Status-only update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Response of a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[allow(clippy::ptr_arg)]
fn validate_description(description: &String) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Description is required".into());
        return Err(err);
    }
    Ok(())
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("Tax rate must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO || *amount > MAX_AMOUNT {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must be between 0 and 999999999999.99".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_max_amount_constant() {
        assert_eq!(MAX_AMOUNT, dec("999999999999.99"));
    }

    #[test]
    fn test_raw_number_accepts_numbers_and_strings() {
        let items: Vec<RawItem> = serde_json::from_str(
            r#"[{"description": "a", "quantity": 2, "unit_price": "19.995"},
                {"description": "b", "quantity": "abc", "unit_price": 1.5}]"#,
        )
        .unwrap();

        assert_eq!(items[0].quantity.as_ref().unwrap().as_f64(), Some(2.0));
        assert_eq!(items[0].unit_price.as_ref().unwrap().to_decimal(), Some(dec("19.995")));
        assert_eq!(items[1].quantity.as_ref().unwrap().as_f64(), None);
        assert_eq!(items[1].unit_price.as_ref().unwrap().to_decimal(), Some(dec("1.5")));
    }

    #[test]
    fn test_float_keeps_shortest_decimal_form() {
        assert_eq!(RawNumber::Number(19.995).to_decimal(), Some(dec("19.995")));
        assert_eq!(RawNumber::Number(f64::NAN).to_decimal(), None);
        assert_eq!(RawNumber::Text("1e3".into()).to_decimal(), Some(dec("1000")));
    }

    #[test]
    fn test_out_of_range_numbers_saturate() {
        assert_eq!(RawNumber::Number(1e30).to_decimal(), Some(Decimal::MAX));
        assert_eq!(RawNumber::Text("1e30".into()).to_decimal(), Some(Decimal::MAX));
        assert_eq!(RawNumber::Number(-1e30).to_decimal(), Some(Decimal::MIN));
        assert_eq!(RawNumber::Text("abc".into()).to_decimal(), None);
    }

    #[test]
    fn test_mistyped_and_unknown_fields_are_rejected() {
        let mistyped = serde_json::from_str::<RawItem>(r#"{"description": "a", "quantity": [1]}"#);
        assert!(mistyped.is_err());

        let unknown = serde_json::from_str::<RawItem>(r#"{"description": "a", "colour": "red"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_create_request_reports_every_failing_field() {
        let request = CreateDocumentRequest {
            tax_rate: dec("120"),
            items: vec![RawItem::new("Repair", 1.0, 10.0), RawItem::new("   ", 1.0, 5.0)],
            ..Default::default()
        };

        let errors = request.validate().unwrap_err();
        let fields = crate::error::flatten_validation_errors(&errors);
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();

        assert_eq!(names, vec!["client_id", "date", "items[1].description", "tax_rate"]);
    }

    #[test]
    fn test_create_request_requires_items() {
        let request = CreateDocumentRequest {
            client_id: Some(Uuid::new_v4()),
            date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        };

        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn test_valid_until_alias() {
        let request: CreateDocumentRequest = serde_json::from_str(
            r#"{"client_id": "5f1c1a5e-8f7a-4c55-9d1a-2b0d7c1e9a10", "date": "2026-03-01",
                "valid_until": "2026-04-01", "tax_rate": 20,
                "items": [{"description": "Repair", "quantity": 2, "unit_price": 50}]}"#,
        )
        .unwrap();

        assert_eq!(request.due_date, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert!(request.validate().is_ok());
    }
}
