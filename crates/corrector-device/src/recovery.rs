//! # Recovery Engine
//!
//! Applies the classifier's disposition to one observed error.
//!
//! ```text
//!   observed (code, text)
//!          │
//!          ▼
//!   classify(code) ── Continue ─────────────────────────────► Ok(())
//!          │
//!          ├── Fail(class) ─────────────────────────────────► Err(class)
//!          ├── RetryAfterDelay ── sleep(busy_backoff) ──────► Err(TransientBusy)
//!          └── CompensateThenFail(c) ── raw commands for c ─► Err(Device)
//! ```
//!
//! The error returned always carries the code and text observed before any
//! compensating command ran.

use tracing::{info, warn};

use crate::classifier::{self, Compensation, Disposition, FailureClass};
use crate::config::DeviceSettings;
use crate::error::{DeviceError, DeviceResult};
use crate::keys;
use crate::mapper::ParameterMapper;
use crate::overrides::{execute_raw, SettingOverrides};
use crate::transport::{Command, DeviceTransport, ObservedError};

/// Turns an observed error into `Ok(())` or the typed failure, running any
/// compensation or backoff on the way.
pub async fn resolve<T: DeviceTransport + ?Sized>(
    transport: &mut T,
    overrides: &mut SettingOverrides,
    settings: &DeviceSettings,
    operation: &str,
    observed: ObservedError,
) -> DeviceResult<()> {
    let ObservedError { code, text } = observed;

    match classifier::classify(code) {
        Disposition::Continue => Ok(()),
        Disposition::Fail(class) => {
            warn!(operation, code, text = %text, ?class, "Device command failed");
            Err(DeviceError::from_class(class, code, text))
        }
        Disposition::RetryAfterDelay => {
            info!(
                operation,
                code,
                backoff_ms = settings.busy_backoff.as_millis() as u64,
                "Device busy, backing off"
            );
            tokio::time::sleep(settings.busy_backoff).await;
            Err(DeviceError::from_class(FailureClass::Busy, code, text))
        }
        Disposition::CompensateThenFail(compensation) => {
            warn!(
                operation,
                code,
                text = %text,
                ?compensation,
                "Device command failed, compensating"
            );
            compensate(transport, overrides, compensation);
            Err(DeviceError::from_class(FailureClass::Device, code, text))
        }
    }
}

/// Issues the corrective commands for a compensation.
pub fn compensate<T: DeviceTransport + ?Sized>(
    transport: &mut T,
    overrides: &mut SettingOverrides,
    compensation: Compensation,
) {
    match compensation {
        Compensation::RestartShift => {
            execute_raw(transport, Command::CancelReceipt);
            ParameterMapper::new(transport).write_close_shift();
            execute_raw(transport, Command::Report);
            ParameterMapper::new(transport).write_open_shift();
            execute_raw(transport, Command::OpenShift);
        }
        Compensation::ReopenShift => {
            ParameterMapper::new(transport).write_open_shift();
            execute_raw(transport, Command::OpenShift);
        }
        Compensation::ZeroCashSettings => {
            overrides.set_temporary(transport, keys::SETTING_CASH_CONTROL, 0);
            overrides.set_temporary(transport, keys::SETTING_MARKER, 0);
        }
    }
}
