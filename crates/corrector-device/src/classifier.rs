//! # Error Classifier
//!
//! Maps the raw code reported by the driver after a command to a
//! [`DeviceErrorKind`] and the [`Disposition`] the register must apply.
//!
//! ## Disposition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Code(s)                          Kind                 Disposition       │
//! │  ───────────────────────────────  ───────────────────  ───────────────── │
//! │  0                                None                 Continue          │
//! │  1 2 3 4 6 14 18 44 45            FatalHardware        Fail(Fatal)       │
//! │  8 13 16 17 48 52 60 63 66        ReceiptFormat        Fail(Format)      │
//! │  15                               UnknownDevice        Fail(Device)      │
//! │  68                               ShiftExpired         Compensate ──┐    │
//! │  73                               ShiftClosed          Compensate ──┤    │
//! │  80                               InsufficientCash     Compensate ──┤    │
//! │  55                               OperationPending     RetryAfterDelay   │
//! │  anything else                    Unrecognized         Fail(Fatal)  │    │
//! │                                                                     ▼    │
//! │                          RestartShift / ReopenShift / ZeroCashSettings   │
//! │                          then Fail(Device)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table is plain data so it can be tested without a device.

use serde::Serialize;

// =============================================================================
// Kinds
// =============================================================================

/// What a device error code means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorKind {
    /// Code 0.
    None,
    /// Device unusable for this session.
    FatalHardware,
    /// Current receipt data is invalid.
    ReceiptFormat,
    /// The driver itself reports an unknown error.
    UnknownDevice,
    /// The shift has been open for more than 24 hours.
    ShiftExpired,
    /// The shift is closed but the operation requires an open one.
    ShiftClosed,
    /// Not enough cash in the drawer for a payout.
    InsufficientCash,
    /// The previous operation has not completed yet.
    OperationPending,
    /// Not in the table.
    Unrecognized,
}

/// Corrective device action issued before an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compensation {
    /// Cancel the open receipt, close the shift, open a new one.
    RestartShift,
    /// Open the shift.
    ReopenShift,
    /// Temporarily zero the two cash-control settings.
    ZeroCashSettings,
}

/// Which typed error the caller finally sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Fatal,
    ReceiptFormat,
    Device,
    Busy,
}

/// What the register does with a command's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// No error; carry on with the protocol.
    Continue,
    /// Report the failure immediately.
    Fail(FailureClass),
    /// Run the compensation, then report a generic device failure.
    CompensateThenFail(Compensation),
    /// Wait out the backoff, then report a busy failure.
    RetryAfterDelay,
}

impl DeviceErrorKind {
    /// Disposition for this kind.
    pub const fn disposition(self) -> Disposition {
        match self {
            DeviceErrorKind::None => Disposition::Continue,
            DeviceErrorKind::FatalHardware | DeviceErrorKind::Unrecognized => {
                Disposition::Fail(FailureClass::Fatal)
            }
            DeviceErrorKind::ReceiptFormat => Disposition::Fail(FailureClass::ReceiptFormat),
            DeviceErrorKind::UnknownDevice => Disposition::Fail(FailureClass::Device),
            DeviceErrorKind::ShiftExpired => {
                Disposition::CompensateThenFail(Compensation::RestartShift)
            }
            DeviceErrorKind::ShiftClosed => {
                Disposition::CompensateThenFail(Compensation::ReopenShift)
            }
            DeviceErrorKind::InsufficientCash => {
                Disposition::CompensateThenFail(Compensation::ZeroCashSettings)
            }
            DeviceErrorKind::OperationPending => Disposition::RetryAfterDelay,
        }
    }
}

// =============================================================================
// Lookup Table
// =============================================================================

/// Every code the classifier knows about, with the driver's meaning.
pub const ERROR_TABLE: &[(i32, DeviceErrorKind, &str)] = &[
    (0, DeviceErrorKind::None, "No error"),
    (1, DeviceErrorKind::FatalHardware, "Connection not established"),
    (2, DeviceErrorKind::FatalHardware, "No link with device"),
    (3, DeviceErrorKind::FatalHardware, "Port busy"),
    (4, DeviceErrorKind::FatalHardware, "Port unavailable"),
    (6, DeviceErrorKind::FatalHardware, "Internal driver error"),
    (14, DeviceErrorKind::FatalHardware, "Driver library failed to load"),
    (18, DeviceErrorKind::FatalHardware, "Cash counter overflow"),
    (44, DeviceErrorKind::FatalHardware, "Out of paper"),
    (45, DeviceErrorKind::FatalHardware, "Cover open"),
    (8, DeviceErrorKind::ReceiptFormat, "Required parameter missing"),
    (13, DeviceErrorKind::ReceiptFormat, "Invalid parameter value"),
    (16, DeviceErrorKind::ReceiptFormat, "Invalid price (sum)"),
    (17, DeviceErrorKind::ReceiptFormat, "Invalid quantity"),
    (48, DeviceErrorKind::ReceiptFormat, "Invalid receipt type"),
    (52, DeviceErrorKind::ReceiptFormat, "Non-cash payments exceed receipt total"),
    (60, DeviceErrorKind::ReceiptFormat, "Invalid payment type"),
    (63, DeviceErrorKind::ReceiptFormat, "Receipt total overflow"),
    (66, DeviceErrorKind::ReceiptFormat, "Receipt not fully paid"),
    (15, DeviceErrorKind::UnknownDevice, "Unknown error"),
    (68, DeviceErrorKind::ShiftExpired, "Shift exceeded 24 hours"),
    (73, DeviceErrorKind::ShiftClosed, "Shift closed, operation impossible"),
    (80, DeviceErrorKind::InsufficientCash, "Not enough cash for payout"),
    (55, DeviceErrorKind::OperationPending, "Previous operation not complete"),
];

/// Looks up the kind of a raw device code.
pub fn kind_of(code: i32) -> DeviceErrorKind {
    ERROR_TABLE
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, kind, _)| *kind)
        .unwrap_or(DeviceErrorKind::Unrecognized)
}

/// Short description of a raw device code, for logs.
pub fn describe(code: i32) -> &'static str {
    ERROR_TABLE
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, text)| *text)
        .unwrap_or("Unrecognized device error")
}

/// Disposition for a raw device code.
///
/// ## Example
/// ```rust
/// use corrector_device::classifier::{classify, Compensation, Disposition};
///
/// assert_eq!(classify(0), Disposition::Continue);
/// assert_eq!(
///     classify(73),
///     Disposition::CompensateThenFail(Compensation::ReopenShift)
/// );
/// ```
pub fn classify(code: i32) -> Disposition {
    kind_of(code).disposition()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FATAL: [i32; 9] = [1, 2, 3, 4, 6, 14, 18, 44, 45];
    const FORMAT: [i32; 9] = [8, 13, 16, 17, 48, 52, 60, 63, 66];

    #[test]
    fn test_table_codes_are_distinct() {
        let mut codes: Vec<i32> = ERROR_TABLE.iter().map(|(c, _, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ERROR_TABLE.len());
        // 0 + 9 fatal + 9 format + unknown + 68 + 73 + 80 + 55
        assert_eq!(ERROR_TABLE.len(), 24);
    }

    #[test]
    fn test_no_error_continues() {
        assert_eq!(classify(0), Disposition::Continue);
    }

    #[test]
    fn test_fatal_codes() {
        for code in FATAL {
            assert_eq!(
                classify(code),
                Disposition::Fail(FailureClass::Fatal),
                "code {code}"
            );
        }
    }

    #[test]
    fn test_receipt_format_codes() {
        for code in FORMAT {
            assert_eq!(
                classify(code),
                Disposition::Fail(FailureClass::ReceiptFormat),
                "code {code}"
            );
        }
    }

    #[test]
    fn test_unknown_device_code() {
        assert_eq!(classify(15), Disposition::Fail(FailureClass::Device));
    }

    #[test]
    fn test_compensating_codes() {
        assert_eq!(
            classify(68),
            Disposition::CompensateThenFail(Compensation::RestartShift)
        );
        assert_eq!(
            classify(73),
            Disposition::CompensateThenFail(Compensation::ReopenShift)
        );
        assert_eq!(
            classify(80),
            Disposition::CompensateThenFail(Compensation::ZeroCashSettings)
        );
    }

    #[test]
    fn test_pending_operation_retries_after_delay() {
        assert_eq!(classify(55), Disposition::RetryAfterDelay);
    }

    #[test]
    fn test_codes_outside_table_are_fatal() {
        let known: Vec<i32> = ERROR_TABLE.iter().map(|(c, _, _)| *c).collect();
        for code in (-10..300).filter(|c| !known.contains(c)) {
            assert_eq!(kind_of(code), DeviceErrorKind::Unrecognized);
            assert_eq!(
                classify(code),
                Disposition::Fail(FailureClass::Fatal),
                "code {code}"
            );
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(44), "Out of paper");
        assert_eq!(describe(9999), "Unrecognized device error");
    }
}
