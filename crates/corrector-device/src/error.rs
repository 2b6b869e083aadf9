//! # Device Error Types
//!
//! Typed failures surfaced by the fiscal register layer.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Device Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  FatalHardware  │  │  ReceiptFormat  │  │     TransientBusy       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Never retried  │  │  Cancel and     │  │  Backoff already        │ │
//! │  │  without an     │  │  rebuild the    │  │  waited; safe to retry  │ │
//! │  │  operator       │  │  receipt        │  │  the same command       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │     Device      │  │  Connection configuration                   │  │
//! │  │                 │  │                                             │  │
//! │  │  Generic; any   │  │  UnsupportedMedium, MissingPort             │  │
//! │  │  compensation   │  │  (raised before the transport is opened)    │  │
//! │  │  already done   │  │                                             │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every device-reported variant carries the raw code and the driver's text.

use thiserror::Error;

use crate::classifier::FailureClass;

/// Result type alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Fiscal register failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device is unusable for this session.
    #[error("Fatal device error {code}: {text}")]
    FatalHardware { code: i32, text: String },

    /// The current receipt's data was rejected.
    #[error("Receipt rejected by device, error {code}: {text}")]
    ReceiptFormat { code: i32, text: String },

    /// Generic device failure, after any compensating action.
    #[error("Device error {code}: {text}")]
    Device { code: i32, text: String },

    /// A previous operation was still running; the backoff has elapsed.
    #[error("Device busy, error {code}: {text}")]
    TransientBusy { code: i32, text: String },

    /// The connection medium cannot be configured on this device.
    #[error("Unsupported connection medium: {0}")]
    UnsupportedMedium(String),

    /// A network connection was requested without a port.
    #[error("Network connection to {address} requires a port")]
    MissingPort { address: String },
}

impl DeviceError {
    /// Builds the error matching a classifier failure class.
    pub fn from_class(class: FailureClass, code: i32, text: impl Into<String>) -> Self {
        let text = text.into();
        match class {
            FailureClass::Fatal => DeviceError::FatalHardware { code, text },
            FailureClass::ReceiptFormat => DeviceError::ReceiptFormat { code, text },
            FailureClass::Device => DeviceError::Device { code, text },
            FailureClass::Busy => DeviceError::TransientBusy { code, text },
        }
    }

    /// Raw device code, when the error came from the device.
    pub fn code(&self) -> Option<i32> {
        match self {
            DeviceError::FatalHardware { code, .. }
            | DeviceError::ReceiptFormat { code, .. }
            | DeviceError::Device { code, .. }
            | DeviceError::TransientBusy { code, .. } => Some(*code),
            DeviceError::UnsupportedMedium(_) | DeviceError::MissingPort { .. } => None,
        }
    }

    /// Returns true if the same command may be sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::TransientBusy { .. })
    }

    /// Returns true if the receipt must be cancelled and rebuilt.
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, DeviceError::ReceiptFormat { .. })
    }

    /// Returns true if nothing more can be done this session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeviceError::FatalHardware { .. }
                | DeviceError::UnsupportedMedium(_)
                | DeviceError::MissingPort { .. }
        )
    }
}
