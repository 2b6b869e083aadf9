//! # Device Transport
//!
//! The narrow capability a fiscal register driver exposes: keyed parameters,
//! named commands, and the last error.
//!
//! ## Call Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Fiscal Operation on the Wire                     │
//! │                                                                         │
//! │   set_param(65631, "Milk")  ─┐                                          │
//! │   set_param(65632, 89.90)    │  parameters staged in the driver         │
//! │   set_param(65633, 2.0)     ─┘                                          │
//! │   execute(Registration)     ──► device does the work                   │
//! │   last_error_code()         ──► 0 = ok, anything else → classifier     │
//! │                                                                         │
//! │   Exactly one command is ever in flight; its result (including the     │
//! │   error code) is read before the next parameter is staged.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Vendor SDK bindings implement [`DeviceTransport`]; the crate ships
//! [`crate::simulator::SimulatedTransport`] as a virtual device.

use chrono::NaiveDateTime;
use corrector_core::Money;
use std::fmt;

// =============================================================================
// Parameter Values
// =============================================================================

/// A typed value for a keyed parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Real(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    /// Fixed-point currency; the binding converts it exactly once.
    Currency(Money),
}

impl ParamValue {
    /// Integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Real(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v:?}"),
            ParamValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            ParamValue::DateTime(v) => write!(f, "{v}"),
            ParamValue::Currency(v) => write!(f, "{v}"),
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Driver commands used by the fiscal protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenShift,
    /// Prints the report selected by the report-type parameter.
    Report,
    OpenReceipt,
    Registration,
    ReceiptTotal,
    Payment,
    CloseReceipt,
    CancelReceipt,
    /// Queries fiscal storage for the data type selected beforehand.
    FnQueryData,
    /// Serializes staged tags into a tag-length-value blob.
    UtilFormTlv,
    ReadDeviceSetting,
    WriteDeviceSetting,
}

impl Command {
    /// Driver method name, for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Command::OpenShift => "openShift",
            Command::Report => "report",
            Command::OpenReceipt => "openReceipt",
            Command::Registration => "registration",
            Command::ReceiptTotal => "receiptTotal",
            Command::Payment => "payment",
            Command::CloseReceipt => "closeReceipt",
            Command::CancelReceipt => "cancelReceipt",
            Command::FnQueryData => "fnQueryData",
            Command::UtilFormTlv => "utilFormTlv",
            Command::ReadDeviceSetting => "readDeviceSetting",
            Command::WriteDeviceSetting => "writeDeviceSetting",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Capability exposed by a fiscal register driver.
///
/// Synchronous; one in-flight command at a time. Errors are not returned
/// from calls but read back through [`last_error_code`](Self::last_error_code)
/// and [`last_error_text`](Self::last_error_text), the way vendor drivers
/// report them.
pub trait DeviceTransport {
    /// Stages a keyed parameter for the next command.
    fn set_param(&mut self, key: u32, value: ParamValue);

    /// Executes a command with the staged parameters.
    fn execute(&mut self, command: Command);

    /// Reads an integer result parameter.
    fn get_param_int(&mut self, key: u32) -> i64;

    /// Reads a byte-sequence result parameter.
    fn get_param_bytes(&mut self, key: u32) -> Vec<u8>;

    /// Code of the last error, 0 when the last call succeeded.
    fn last_error_code(&self) -> i32;

    /// Human-readable text of the last error.
    fn last_error_text(&self) -> String;

    /// Stages a driver connection setting (medium, address, port).
    fn set_single_setting(&mut self, key: &str, value: &str);

    /// Applies staged connection settings.
    fn apply_single_settings(&mut self);

    /// Opens the link to the device.
    fn open(&mut self);

    /// Closes the link to the device.
    fn close(&mut self);

    /// Releases the driver handle.
    fn destroy(&mut self);
}

impl<T: DeviceTransport + ?Sized> DeviceTransport for &mut T {
    fn set_param(&mut self, key: u32, value: ParamValue) {
        (**self).set_param(key, value)
    }

    fn execute(&mut self, command: Command) {
        (**self).execute(command)
    }

    fn get_param_int(&mut self, key: u32) -> i64 {
        (**self).get_param_int(key)
    }

    fn get_param_bytes(&mut self, key: u32) -> Vec<u8> {
        (**self).get_param_bytes(key)
    }

    fn last_error_code(&self) -> i32 {
        (**self).last_error_code()
    }

    fn last_error_text(&self) -> String {
        (**self).last_error_text()
    }

    fn set_single_setting(&mut self, key: &str, value: &str) {
        (**self).set_single_setting(key, value)
    }

    fn apply_single_settings(&mut self) {
        (**self).apply_single_settings()
    }

    fn open(&mut self) {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}

/// The error observed right after a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedError {
    pub code: i32,
    pub text: String,
}

impl ObservedError {
    /// Reads the last error from the transport.
    pub fn read<T: DeviceTransport + ?Sized>(transport: &T) -> Self {
        ObservedError {
            code: transport.last_error_code(),
            text: transport.last_error_text(),
        }
    }

    /// Returns true if the call succeeded.
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(Command::OpenShift.to_string(), "openShift");
        assert_eq!(Command::UtilFormTlv.name(), "utilFormTlv");
    }

    #[test]
    fn test_param_display() {
        assert_eq!(ParamValue::Int(7).to_string(), "7");
        assert_eq!(ParamValue::Bytes(vec![1, 2, 3]).to_string(), "<3 bytes>");
        assert_eq!(
            ParamValue::Currency(Money::from_kopecks(8_990)).to_string(),
            "89.90"
        );
        assert_eq!(ParamValue::Int(7).as_int(), Some(7));
        assert_eq!(ParamValue::Bool(true).as_int(), None);
    }
}
