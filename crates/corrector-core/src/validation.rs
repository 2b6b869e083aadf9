//! # Validation Module
//!
//! Caller-side receipt checks.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Feed parser                                                  │
//! │  └── Type validation (deserialization, tax/unit codes)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Replay runner                                                │
//! │  └── THIS MODULE: structural checks before the device is touched       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Fiscal register                                              │
//! │  ├── Payment sum == total (code 66)                                    │
//! │  └── Price / quantity ranges (codes 16, 17)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The device layer never re-validates; whatever it is handed goes to the
//! register as-is.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{LineItem, Payment, Receipt};
use crate::{MAX_ITEM_NAME_CHARS, MAX_RECEIPT_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Tolerance between a line total and `round(price × quantity)`.
const LINE_TOTAL_TOLERANCE_KOPECKS: i64 = 1;

/// Validates a line item.
///
/// ## Rules
/// - Name is non-empty and at most 128 characters
/// - Quantity is positive
/// - Price and total are not negative
/// - Total equals `round(price × quantity)` within one kopeck
pub fn validate_line_item(index: usize, item: &LineItem) -> ValidationResult<()> {
    let name = item.name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: format!("items[{index}].name"),
        });
    }
    if name.chars().count() > MAX_ITEM_NAME_CHARS {
        return Err(ValidationError::TooLong {
            field: format!("items[{index}].name"),
            max: MAX_ITEM_NAME_CHARS,
        });
    }

    if !(item.quantity > 0.0) {
        return Err(ValidationError::MustBePositive {
            field: format!("items[{index}].quantity"),
        });
    }

    if item.price.is_negative() || item.total.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: format!("items[{index}].price"),
        });
    }

    let expected = item.price.times_quantity(item.quantity);
    if (expected - item.total).kopecks().abs() > LINE_TOTAL_TOLERANCE_KOPECKS {
        return Err(ValidationError::TotalMismatch {
            index,
            expected: expected.kopecks(),
            actual: item.total.kopecks(),
        });
    }

    Ok(())
}

/// Validates that no payment component is negative.
pub fn validate_payment(payment: &Payment) -> ValidationResult<()> {
    let components: [(&str, Money); 5] = [
        ("payment.cash", payment.cash),
        ("payment.electronic", payment.electronic),
        ("payment.prepaid", payment.prepaid),
        ("payment.postpaid", payment.postpaid),
        ("payment.provision", payment.provision),
    ];

    for (field, sum) in components {
        if sum.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a whole receipt.
///
/// ## Example
/// ```rust
/// use corrector_core::validation::validate_receipt;
/// use corrector_core::{Money, Operation, Payment, Receipt};
///
/// let empty = Receipt {
///     document_number: 1,
///     total: Money::zero(),
///     items: vec![],
///     payment: Payment::default(),
///     operation: Operation::INCOME,
///     correction: None,
/// };
/// assert!(validate_receipt(&empty).is_err());
/// ```
pub fn validate_receipt(receipt: &Receipt) -> ValidationResult<()> {
    if receipt.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if receipt.items.len() > MAX_RECEIPT_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_RECEIPT_ITEMS,
        });
    }

    for (index, item) in receipt.items.iter().enumerate() {
        validate_line_item(index, item)?;
    }

    validate_payment(&receipt.payment)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MeasureUnit, Operation, TaxRate};

    fn item(price: i64, quantity: f64, total: i64) -> LineItem {
        LineItem {
            name: "Milk 1L".to_string(),
            price: Money::from_kopecks(price),
            quantity,
            total: Money::from_kopecks(total),
            tax_rate: TaxRate::Vat10,
            measure_unit: MeasureUnit::PIECE,
            payment_method: 4,
            subject_type: 1,
        }
    }

    fn receipt(items: Vec<LineItem>) -> Receipt {
        Receipt {
            document_number: 42,
            total: items.iter().map(|i| i.total).sum(),
            items,
            payment: Payment::default(),
            operation: Operation::INCOME,
            correction: None,
        }
    }

    #[test]
    fn test_valid_receipt() {
        let r = receipt(vec![item(8_990, 2.0, 17_980), item(9_999, 0.333, 3_330)]);
        assert!(validate_receipt(&r).is_ok());
    }

    #[test]
    fn test_empty_receipt_rejected() {
        let r = receipt(vec![]);
        assert!(matches!(
            validate_receipt(&r),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_line_total_mismatch() {
        let r = receipt(vec![item(1_000, 3.0, 2_900)]);
        assert!(matches!(
            validate_receipt(&r),
            Err(ValidationError::TotalMismatch {
                index: 0,
                expected: 3_000,
                actual: 2_900
            })
        ));
    }

    #[test]
    fn test_line_total_within_tolerance() {
        assert!(validate_line_item(0, &item(1_000, 3.0, 3_001)).is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(matches!(
            validate_line_item(0, &item(1_000, 0.0, 0)),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut i = item(1_000, 1.0, 1_000);
        i.name = "   ".to_string();
        assert!(validate_line_item(0, &i).is_err());
    }

    #[test]
    fn test_negative_payment_rejected() {
        let payment = Payment {
            electronic: Money::from_kopecks(-1),
            ..Payment::default()
        };
        assert!(matches!(
            validate_payment(&payment),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }
}
