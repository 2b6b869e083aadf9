//! Numeric parameter keys of the vendor protocol.
//!
//! Keys below 10000 are fiscal data format tags; the 65xxx range is the
//! driver's own parameter space.

// Receipts
pub const RECEIPT_TYPE: u32 = 65545;
pub const REPORT_TYPE: u32 = 65546;
pub const IS_CORRECTION: u32 = 65572;
pub const RECEIPT_SUM: u32 = 65613;

// Payments
pub const PAYMENT_TYPE: u32 = 65564;
pub const PAYMENT_SUM: u32 = 65565;

// Positions
pub const TAX_TYPE: u32 = 65569;
pub const COMMODITY_NAME: u32 = 65631;
pub const PRICE: u32 = 65632;
pub const QUANTITY: u32 = 65633;
pub const POSITION_SUM: u32 = 65634;

// Fiscal storage queries
pub const FN_DATA_TYPE: u32 = 65622;
pub const TAG_VALUE: u32 = 65624;
pub const DOCUMENTS_COUNT: u32 = 65625;
pub const FFD_VERSION: u32 = 65629;

// Device settings
pub const SETTING_ID: u32 = 65650;
pub const SETTING_VALUE: u32 = 65651;

/// Flag required by fiscal compliance before shift operations.
pub const REPORT_ELECTRONICALLY: u32 = 65749;

// Fiscal data format tags
pub const TAG_CORRECTION_TYPE: u32 = 1173;
pub const TAG_CORRECTION_BASE: u32 = 1174;
pub const TAG_CORRECTION_DATE: u32 = 1178;
pub const TAG_CORRECTION_DOC_NUMBER: u32 = 1179;
pub const TAG_ADDITIONAL_REQUISITE: u32 = 1192;
pub const TAG_SUBJECT_TYPE: u32 = 1212;
pub const TAG_PAYMENT_METHOD: u32 = 1214;
pub const TAG_MEASURE_UNIT: u32 = 2108;

// Values
/// `FN_DATA_TYPE` selector: count of documents not yet sent to the OFD.
pub const FN_DATA_OFD_EXCHANGE_STATUS: i64 = 1;
/// `FN_DATA_TYPE` selector: fiscal storage format versions.
pub const FN_DATA_FFD_VERSIONS: i64 = 7;
/// `REPORT_TYPE` value for the shift-close report.
pub const REPORT_CLOSE_SHIFT: i64 = 0;
/// Fiscal data format 1.2, the first to carry tag 2108.
pub const FFD_1_2: i64 = 120;

// Settings touched by the insufficient-cash recovery
/// Marker setting whose current value is recorded as the restore value.
pub const SETTING_MARKER: i64 = 4;
pub const SETTING_CASH_CONTROL: i64 = 56;
