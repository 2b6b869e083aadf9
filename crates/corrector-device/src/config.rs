//! Register behavior knobs that are not part of the connection.

use std::time::Duration;

/// Default wait after "previous operation not complete".
pub const DEFAULT_BUSY_BACKOFF: Duration = Duration::from_secs(1);

/// Behavior settings for a [`crate::FiscalRegister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    /// How long to wait before reporting a busy device.
    pub busy_backoff: Duration,

    /// Apply the cash sum as the provision payment amount, as older
    /// installations did.
    pub provision_uses_cash_sum: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            busy_backoff: DEFAULT_BUSY_BACKOFF,
            provision_uses_cash_sum: false,
        }
    }
}
