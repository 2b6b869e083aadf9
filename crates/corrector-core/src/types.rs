//! # Domain Types
//!
//! Receipt model replayed onto the fiscal register.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Receipt      │   │    LineItem     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  document_number│   │  name           │   │  cash           │       │
//! │  │  total          │──►│  price, quantity│   │  electronic     │       │
//! │  │  items          │   │  total          │   │  prepaid        │       │
//! │  │  payment        │   │  tax_rate       │   │  postpaid       │       │
//! │  │  operation      │   │  measure_unit   │   │  provision      │       │
//! │  │  correction     │   │  payment_method │   └─────────────────┘       │
//! │  └────────┬────────┘   │  subject_type   │                             │
//! │           │            └─────────────────┘                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ CorrectionData  │   │   Operation     │                             │
//! │  │  created_at     │   │  is_income      │                             │
//! │  │  document_id    │   │  is_refund      │                             │
//! │  │  fiscal_sign    │   └─────────────────┘                             │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Receipt` is immutable once handed to the device layer; the lifecycle
//! controller only reads it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// VAT rate as defined by fiscal data format tag 1199.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRate {
    /// 20%
    Vat20,
    /// 10%
    Vat10,
    /// 20/120 (calculated rate)
    Vat20Over120,
    /// 10/110 (calculated rate)
    Vat10Over110,
    /// 0%
    Vat0,
    /// Not subject to VAT
    NoVat,
}

impl TaxRate {
    /// Parses the tag 1199 code used by OFD portals.
    pub fn from_ffd_code(code: u8) -> CoreResult<Self> {
        match code {
            1 => Ok(TaxRate::Vat20),
            2 => Ok(TaxRate::Vat10),
            3 => Ok(TaxRate::Vat20Over120),
            4 => Ok(TaxRate::Vat10Over110),
            5 => Ok(TaxRate::Vat0),
            6 => Ok(TaxRate::NoVat),
            other => Err(CoreError::UnknownTaxRate(other)),
        }
    }

    /// Returns the tag 1199 code.
    pub const fn ffd_code(&self) -> u8 {
        match self {
            TaxRate::Vat20 => 1,
            TaxRate::Vat10 => 2,
            TaxRate::Vat20Over120 => 3,
            TaxRate::Vat10Over110 => 4,
            TaxRate::Vat0 => 5,
            TaxRate::NoVat => 6,
        }
    }
}

// =============================================================================
// Measure Unit
// =============================================================================

/// Codes defined for tag 2108 (measure of quantity).
const MEASURE_UNITS: &[(u8, &str)] = &[
    (0, "pcs"),
    (10, "g"),
    (11, "kg"),
    (12, "t"),
    (20, "cm"),
    (21, "dm"),
    (22, "m"),
    (30, "cm2"),
    (31, "dm2"),
    (32, "m2"),
    (40, "ml"),
    (41, "l"),
    (42, "m3"),
    (50, "kWh"),
    (51, "Gcal"),
    (70, "day"),
    (71, "h"),
    (72, "min"),
    (73, "s"),
    (80, "KB"),
    (81, "MB"),
    (82, "GB"),
    (83, "TB"),
    (255, "other"),
];

/// Measure of quantity (tag 2108).
///
/// Only fiscal data format 1.2 devices accept this field. Receipts coming
/// from devices on older formats carry no unit at all, which is modelled as
/// [`MeasureUnit::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasureUnit(Option<u8>);

impl MeasureUnit {
    /// No unit reported by the source.
    pub const UNKNOWN: MeasureUnit = MeasureUnit(None);

    /// Pieces (the format's default unit).
    pub const PIECE: MeasureUnit = MeasureUnit(Some(0));

    /// Creates a unit from its tag 2108 code.
    pub fn from_code(code: u8) -> CoreResult<Self> {
        if MEASURE_UNITS.iter().any(|(c, _)| *c == code) {
            Ok(MeasureUnit(Some(code)))
        } else {
            Err(CoreError::UnknownMeasureUnit(code))
        }
    }

    /// Returns the tag 2108 code, if the unit is known.
    #[inline]
    pub const fn code(&self) -> Option<u8> {
        self.0
    }

    /// Code to write to the device; an unknown unit falls back to pieces.
    #[inline]
    pub fn device_code(&self) -> u8 {
        self.0.unwrap_or(0)
    }

    /// Returns true if the source reported a unit.
    #[inline]
    pub const fn is_known(&self) -> bool {
        self.0.is_some()
    }

    /// Short display name; `-` for an unknown unit.
    pub fn name(&self) -> &'static str {
        self.0
            .and_then(|code| MEASURE_UNITS.iter().find(|(c, _)| *c == code))
            .map(|(_, name)| *name)
            .unwrap_or("-")
    }
}

// =============================================================================
// Operation
// =============================================================================

/// Direction of the settlement.
///
/// `is_income` distinguishes income (sale to a customer) from expense
/// (purchase); `is_refund` marks the return variant of either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Operation {
    pub is_income: bool,
    pub is_refund: bool,
}

impl Operation {
    /// Plain income (sale).
    pub const INCOME: Operation = Operation {
        is_income: true,
        is_refund: false,
    };

    /// Parses the OFD portal spelling: `Income`, `Refund income`, `Expense`,
    /// `Refund expense` (case-insensitive).
    pub fn from_portal_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Operation {
            is_income: name.ends_with("income"),
            is_refund: name.starts_with("refund"),
        }
    }
}

// =============================================================================
// Correction Data
// =============================================================================

/// Reference to the document a correction receipt amends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionData {
    /// When the original document was created (tag 1178).
    pub created_at: NaiveDateTime,

    /// Number of the original document (tag 1179).
    ///
    /// Passed through as supplied by the feed; portals that do not expose
    /// it yield a blank placeholder.
    pub document_id: String,

    /// Fiscal sign of the original document; blank when the original was
    /// never fiscalized.
    pub fiscal_sign: String,
}

impl CorrectionData {
    /// Returns true when a non-blank fiscal sign is present.
    pub fn has_fiscal_sign(&self) -> bool {
        !self.fiscal_sign.trim().is_empty()
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A position on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Commodity name as printed.
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Quantity; fractional for weighed goods.
    pub quantity: f64,
    /// Position sum, `round(price × quantity)`.
    pub total: Money,
    pub tax_rate: TaxRate,
    pub measure_unit: MeasureUnit,
    /// Payment method code (tag 1214).
    pub payment_method: u8,
    /// Subject type code (tag 1212).
    pub subject_type: u8,
}

// =============================================================================
// Payment
// =============================================================================

/// Payment breakdown of a receipt.
///
/// The sum of all components equals the receipt total; the device enforces
/// this, not this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payment {
    pub cash: Money,
    pub electronic: Money,
    pub prepaid: Money,
    pub postpaid: Money,
    /// Counter-provision ("встречное предоставление").
    #[serde(default)]
    pub provision: Money,
}

// =============================================================================
// Receipt
// =============================================================================

/// A receipt to fiscalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Document number on the source register.
    pub document_number: u32,
    /// Declared receipt total.
    pub total: Money,
    pub items: Vec<LineItem>,
    pub payment: Payment,
    pub operation: Operation,
    /// Present for correction receipts.
    pub correction: Option<CorrectionData>,
}

impl Receipt {
    /// Returns true if this receipt amends an earlier document.
    #[inline]
    pub fn is_correction(&self) -> bool {
        self.correction.is_some()
    }
}

// =============================================================================
// Replay Counters
// =============================================================================

/// Outcome of replaying a batch, sent to the reporting sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub success: u32,
    pub total: u32,
}

impl Counters {
    /// Number of receipts that were not fiscalized.
    pub fn failed(&self) -> u32 {
        self.total.saturating_sub(self.success)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_codes() {
        for code in 1..=6 {
            let rate = TaxRate::from_ffd_code(code).unwrap();
            assert_eq!(rate.ffd_code(), code);
        }
        assert!(matches!(
            TaxRate::from_ffd_code(0),
            Err(CoreError::UnknownTaxRate(0))
        ));
    }

    #[test]
    fn test_measure_unit_lookup() {
        let kg = MeasureUnit::from_code(11).unwrap();
        assert_eq!(kg.code(), Some(11));
        assert_eq!(kg.name(), "kg");
        assert!(MeasureUnit::from_code(99).is_err());

        assert_eq!(MeasureUnit::UNKNOWN.name(), "-");
        assert_eq!(MeasureUnit::UNKNOWN.device_code(), 0);
        assert!(!MeasureUnit::default().is_known());
    }

    #[test]
    fn test_operation_from_portal_name() {
        assert_eq!(Operation::from_portal_name("Income"), Operation::INCOME);
        assert_eq!(
            Operation::from_portal_name("Refund income"),
            Operation {
                is_income: true,
                is_refund: true
            }
        );
        assert_eq!(
            Operation::from_portal_name("Expense"),
            Operation {
                is_income: false,
                is_refund: false
            }
        );
        assert_eq!(
            Operation::from_portal_name("REFUND EXPENSE"),
            Operation {
                is_income: false,
                is_refund: true
            }
        );
    }

    #[test]
    fn test_fiscal_sign_blank_detection() {
        let mut data = CorrectionData {
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            document_id: " ".to_string(),
            fiscal_sign: " ".to_string(),
        };
        assert!(!data.has_fiscal_sign());
        data.fiscal_sign = "3826291845".to_string();
        assert!(data.has_fiscal_sign());
    }

    #[test]
    fn test_counters_failed() {
        let counters = Counters {
            success: 7,
            total: 10,
        };
        assert_eq!(counters.failed(), 3);
    }
}
