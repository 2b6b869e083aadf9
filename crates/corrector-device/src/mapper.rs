//! # Parameter Mapper
//!
//! Turns domain values into keyed parameter writes. Apart from the
//! transport call each method wraps, everything here is pure.
//!
//! ## Vendor Codes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Receipt type (65545)        ordinary   correction                     │
//! │  ──────────────────────────  ────────   ──────────                     │
//! │  income (sell)                   1          7                          │
//! │  refund income                   2          8                          │
//! │  expense (buy)                   4          9                          │
//! │  refund expense                  5         10                          │
//! │                                                                         │
//! │  Tax type (65569)     vat20 → 7   vat10 → 2   vat20/120 → 8            │
//! │                       vat10/110 → 4   vat0 → 5   none → 6              │
//! │                                                                         │
//! │  Payment type (65564) cash 0, electronic 1, prepaid 2, postpaid 3,     │
//! │                       provision 4                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use corrector_core::{CorrectionData, LineItem, Money, Operation, Payment, TaxRate};
use tracing::trace;

use crate::keys;
use crate::transport::{DeviceTransport, ParamValue};

// =============================================================================
// Code Tables
// =============================================================================

/// Receipt type code for an operation.
pub const fn receipt_type_code(operation: Operation, correction: bool) -> i64 {
    match (operation.is_income, operation.is_refund, correction) {
        (true, false, false) => 1,
        (true, true, false) => 2,
        (false, false, false) => 4,
        (false, true, false) => 5,
        (true, false, true) => 7,
        (true, true, true) => 8,
        (false, false, true) => 9,
        (false, true, true) => 10,
    }
}

/// Device tax type for a rate.
pub const fn tax_device_id(rate: TaxRate) -> i64 {
    match rate {
        TaxRate::Vat20 => 7,
        TaxRate::Vat10 => 2,
        TaxRate::Vat20Over120 => 8,
        TaxRate::Vat10Over110 => 4,
        TaxRate::Vat0 => 5,
        TaxRate::NoVat => 6,
    }
}

/// Payment component, in the order the device receives them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentKind {
    Cash,
    Electronic,
    Prepaid,
    Postpaid,
    Provision,
}

impl PaymentKind {
    pub const ALL: [PaymentKind; 5] = [
        PaymentKind::Cash,
        PaymentKind::Electronic,
        PaymentKind::Prepaid,
        PaymentKind::Postpaid,
        PaymentKind::Provision,
    ];

    /// Payment type code.
    pub const fn code(self) -> i64 {
        match self {
            PaymentKind::Cash => 0,
            PaymentKind::Electronic => 1,
            PaymentKind::Prepaid => 2,
            PaymentKind::Postpaid => 3,
            PaymentKind::Provision => 4,
        }
    }
}

/// Components to send, skipping anything not strictly positive.
///
/// With `provision_uses_cash_sum` the provision line carries the cash
/// amount, matching older installations. Whether provision is sent at all
/// still depends on the provision amount.
pub fn payment_components(
    payment: &Payment,
    provision_uses_cash_sum: bool,
) -> Vec<(PaymentKind, Money)> {
    PaymentKind::ALL
        .iter()
        .filter_map(|kind| {
            let declared = match kind {
                PaymentKind::Cash => payment.cash,
                PaymentKind::Electronic => payment.electronic,
                PaymentKind::Prepaid => payment.prepaid,
                PaymentKind::Postpaid => payment.postpaid,
                PaymentKind::Provision => payment.provision,
            };
            if !declared.is_positive() {
                return None;
            }
            let sent = match kind {
                PaymentKind::Provision if provision_uses_cash_sum => payment.cash,
                _ => declared,
            };
            Some((*kind, sent))
        })
        .collect()
}

// =============================================================================
// Mapper
// =============================================================================

/// Typed parameter access over a borrowed transport.
pub struct ParameterMapper<'a, T: DeviceTransport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: DeviceTransport + ?Sized> ParameterMapper<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        ParameterMapper { transport }
    }

    fn set(&mut self, key: u32, value: ParamValue) {
        trace!(key, %value, "set param");
        self.transport.set_param(key, value);
    }

    pub fn set_int(&mut self, key: u32, value: i64) {
        self.set(key, ParamValue::Int(value));
    }

    pub fn set_real(&mut self, key: u32, value: f64) {
        self.set(key, ParamValue::Real(value));
    }

    pub fn set_money(&mut self, key: u32, value: Money) {
        self.set(key, ParamValue::Currency(value));
    }

    pub fn set_bool(&mut self, key: u32, value: bool) {
        self.set(key, ParamValue::Bool(value));
    }

    pub fn set_text(&mut self, key: u32, value: &str) {
        self.set(key, ParamValue::Text(value.to_string()));
    }

    pub fn set_bytes(&mut self, key: u32, value: Vec<u8>) {
        self.set(key, ParamValue::Bytes(value));
    }

    pub fn set_datetime(&mut self, key: u32, value: NaiveDateTime) {
        self.set(key, ParamValue::DateTime(value));
    }

    pub fn get_int(&mut self, key: u32) -> i64 {
        self.transport.get_param_int(key)
    }

    pub fn get_bytes(&mut self, key: u32) -> Vec<u8> {
        self.transport.get_param_bytes(key)
    }

    // =========================================================================
    // Composite Writes
    // =========================================================================

    /// Stages the tags that form the correction basis blob.
    pub fn write_correction_basis(&mut self, correction: &CorrectionData) {
        self.set_datetime(keys::TAG_CORRECTION_DATE, correction.created_at);
        self.set_text(keys::TAG_CORRECTION_DOC_NUMBER, &correction.document_id);
    }

    /// Stages the correction receipt header around an already formed blob.
    ///
    /// Tag 1192 is written only for a non-blank fiscal sign.
    pub fn write_correction_header(
        &mut self,
        operation: Operation,
        correction: &CorrectionData,
        basis: Vec<u8>,
    ) {
        let signed = correction.has_fiscal_sign();
        self.set_int(keys::RECEIPT_TYPE, receipt_type_code(operation, true));
        self.set_bool(keys::IS_CORRECTION, true);
        self.set_int(keys::TAG_CORRECTION_TYPE, i64::from(signed));
        self.set_bytes(keys::TAG_CORRECTION_BASE, basis);
        if signed {
            self.set_text(keys::TAG_ADDITIONAL_REQUISITE, &correction.fiscal_sign);
        }
    }

    /// Stages a position; the measure unit only when the format carries it.
    pub fn write_item(&mut self, item: &LineItem, with_measure_unit: bool) {
        self.set_text(keys::COMMODITY_NAME, &item.name);
        self.set_money(keys::PRICE, item.price);
        self.set_real(keys::QUANTITY, item.quantity);
        self.set_money(keys::POSITION_SUM, item.total);
        self.set_int(keys::TAG_SUBJECT_TYPE, i64::from(item.subject_type));
        self.set_int(keys::TAX_TYPE, tax_device_id(item.tax_rate));
        if with_measure_unit {
            self.set_int(keys::TAG_MEASURE_UNIT, i64::from(item.measure_unit.device_code()));
        }
        self.set_int(keys::TAG_PAYMENT_METHOD, i64::from(item.payment_method));
    }

    pub fn write_open_shift(&mut self) {
        self.set_bool(keys::REPORT_ELECTRONICALLY, true);
    }

    pub fn write_close_shift(&mut self) {
        self.set_bool(keys::REPORT_ELECTRONICALLY, true);
        self.set_int(keys::REPORT_TYPE, keys::REPORT_CLOSE_SHIFT);
    }

    pub fn write_payment(&mut self, kind: PaymentKind, sum: Money) {
        self.set_int(keys::PAYMENT_TYPE, kind.code());
        self.set_money(keys::PAYMENT_SUM, sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{Call, SimulatedTransport};
    use chrono::NaiveDate;
    use corrector_core::MeasureUnit;

    fn item() -> LineItem {
        LineItem {
            name: "Milk 1L".into(),
            price: Money::from_kopecks(8_990),
            quantity: 2.0,
            total: Money::from_kopecks(17_980),
            tax_rate: TaxRate::Vat10,
            measure_unit: MeasureUnit::PIECE,
            payment_method: 4,
            subject_type: 1,
        }
    }

    fn correction(sign: &str) -> CorrectionData {
        CorrectionData {
            created_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 15, 0)
                .unwrap(),
            document_id: " ".into(),
            fiscal_sign: sign.into(),
        }
    }

    #[test]
    fn test_receipt_type_codes() {
        let op = |is_income, is_refund| Operation { is_income, is_refund };
        assert_eq!(receipt_type_code(op(true, false), false), 1);
        assert_eq!(receipt_type_code(op(true, true), false), 2);
        assert_eq!(receipt_type_code(op(false, false), false), 4);
        assert_eq!(receipt_type_code(op(false, true), false), 5);
        assert_eq!(receipt_type_code(op(true, false), true), 7);
        assert_eq!(receipt_type_code(op(false, true), true), 10);
    }

    #[test]
    fn test_payment_components_skip_non_positive() {
        let payment = Payment {
            cash: Money::from_kopecks(500),
            electronic: Money::zero(),
            prepaid: Money::from_kopecks(-100),
            postpaid: Money::from_kopecks(200),
            provision: Money::zero(),
        };
        let components = payment_components(&payment, false);
        assert_eq!(
            components,
            vec![
                (PaymentKind::Cash, Money::from_kopecks(500)),
                (PaymentKind::Postpaid, Money::from_kopecks(200)),
            ]
        );
    }

    #[test]
    fn test_provision_amount() {
        let payment = Payment {
            cash: Money::from_kopecks(300),
            provision: Money::from_kopecks(700),
            ..Payment::default()
        };
        assert_eq!(
            payment_components(&payment, false).last(),
            Some(&(PaymentKind::Provision, Money::from_kopecks(700)))
        );
        assert_eq!(
            payment_components(&payment, true).last(),
            Some(&(PaymentKind::Provision, Money::from_kopecks(300)))
        );
    }

    #[test]
    fn test_item_write_order() {
        let mut sim = SimulatedTransport::new();
        ParameterMapper::new(&mut sim).write_item(&item(), true);
        let keys: Vec<u32> = sim.param_keys();
        assert_eq!(
            keys,
            vec![65631, 65632, 65633, 65634, 1212, 65569, 2108, 1214]
        );
        assert!(sim
            .calls()
            .contains(&Call::SetParam(keys::TAX_TYPE, ParamValue::Int(2))));
    }

    #[test]
    fn test_item_without_measure_unit() {
        let mut sim = SimulatedTransport::new();
        ParameterMapper::new(&mut sim).write_item(&item(), false);
        assert!(!sim.param_keys().contains(&keys::TAG_MEASURE_UNIT));
    }

    #[test]
    fn test_correction_header_signature_only_when_present() {
        let mut sim = SimulatedTransport::new();
        ParameterMapper::new(&mut sim).write_correction_header(
            Operation::INCOME,
            &correction("   "),
            vec![1, 2],
        );
        assert!(!sim.param_keys().contains(&keys::TAG_ADDITIONAL_REQUISITE));
        assert!(sim
            .calls()
            .contains(&Call::SetParam(keys::TAG_CORRECTION_TYPE, ParamValue::Int(0))));

        let mut sim = SimulatedTransport::new();
        ParameterMapper::new(&mut sim).write_correction_header(
            Operation::INCOME,
            &correction("1234567890"),
            vec![1, 2],
        );
        assert!(sim.calls().contains(&Call::SetParam(
            keys::TAG_ADDITIONAL_REQUISITE,
            ParamValue::Text("1234567890".into())
        )));
        assert!(sim
            .calls()
            .contains(&Call::SetParam(keys::TAG_CORRECTION_TYPE, ParamValue::Int(1))));
        assert!(sim
            .calls()
            .contains(&Call::SetParam(keys::RECEIPT_TYPE, ParamValue::Int(7))));
    }
}
