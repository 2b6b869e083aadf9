//! # Settings Override Manager
//!
//! Device settings changed to get past an error are temporary: each one is
//! recorded with the value to put back, and everything recorded is written
//! back when the connection ends.
//!
//! ```text
//! set_temporary(56, 0)
//!   read setting 4 ──► restore value r
//!   record (56, r)  (only if 56 is not recorded yet)
//!   write 56 = 0
//!
//! restore_all()
//!   for (key, r) in records: write key = r
//!   clear records
//! ```
//!
//! Commands issued here are raw: a failing read or write is logged and
//! never fed back into the error classifier.

use tracing::{debug, warn};

use crate::keys;
use crate::mapper::ParameterMapper;
use crate::transport::{Command, DeviceTransport, ObservedError};

/// Reads device setting `id`.
pub fn read_device_setting<T: DeviceTransport + ?Sized>(transport: &mut T, id: i64) -> i64 {
    let mut mapper = ParameterMapper::new(transport);
    mapper.set_int(keys::SETTING_ID, id);
    execute_raw(transport, Command::ReadDeviceSetting);
    transport.get_param_int(keys::SETTING_VALUE)
}

/// Writes device setting `id`.
pub fn write_device_setting<T: DeviceTransport + ?Sized>(transport: &mut T, id: i64, value: i64) {
    let mut mapper = ParameterMapper::new(transport);
    mapper.set_int(keys::SETTING_ID, id);
    mapper.set_int(keys::SETTING_VALUE, value);
    execute_raw(transport, Command::WriteDeviceSetting);
}

/// Executes without classification, logging any error.
pub(crate) fn execute_raw<T: DeviceTransport + ?Sized>(transport: &mut T, command: Command) {
    transport.execute(command);
    let observed = ObservedError::read(transport);
    if !observed.is_ok() {
        warn!(
            command = %command,
            code = observed.code,
            text = %observed.text,
            "Compensating command failed"
        );
    }
}

/// Temporary device setting changes owned by one connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingOverrides {
    records: Vec<(i64, i64)>,
}

impl SettingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Recorded `(key, restore value)` pairs, oldest first.
    pub fn records(&self) -> &[(i64, i64)] {
        &self.records
    }

    /// Overrides setting `key` with `value` until [`restore_all`](Self::restore_all).
    ///
    /// The restore value is read from the marker setting. A key already
    /// recorded keeps its first restore value.
    pub fn set_temporary<T: DeviceTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        key: i64,
        value: i64,
    ) {
        let restore = read_device_setting(transport, keys::SETTING_MARKER);
        if self.records.iter().any(|(k, _)| *k == key) {
            debug!(key, "Setting already overridden, keeping first restore value");
        } else {
            self.records.push((key, restore));
        }
        write_device_setting(transport, key, value);
        debug!(key, value, restore, "Device setting overridden");
    }

    /// Writes every recorded value back and forgets them.
    pub fn restore_all<T: DeviceTransport + ?Sized>(&mut self, transport: &mut T) {
        if self.records.is_empty() {
            return;
        }
        for (key, value) in self.records.drain(..) {
            write_device_setting(transport, key, value);
            debug!(key, value, "Device setting restored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatedTransport;

    #[test]
    fn test_restore_without_records_is_silent() {
        let mut sim = SimulatedTransport::new();
        let mut overrides = SettingOverrides::new();
        overrides.restore_all(&mut sim);
        assert!(sim.calls().is_empty());
    }

    #[test]
    fn test_override_and_restore() {
        let mut sim = SimulatedTransport::new().with_setting(4, 1).with_setting(56, 1);
        let mut overrides = SettingOverrides::new();

        overrides.set_temporary(&mut sim, 56, 0);
        overrides.set_temporary(&mut sim, 4, 0);
        assert_eq!(overrides.len(), 2);
        assert_eq!(sim.setting(56), Some(0));
        assert_eq!(sim.setting(4), Some(0));
        // Both restore values come from setting 4, read before it changed
        assert_eq!(overrides.records(), &[(56, 1), (4, 1)]);

        overrides.restore_all(&mut sim);
        assert!(overrides.is_empty());
        assert_eq!(sim.setting(56), Some(1));
        assert_eq!(sim.setting(4), Some(1));
    }

    #[test]
    fn test_first_restore_value_wins() {
        let mut sim = SimulatedTransport::new().with_setting(4, 3);
        let mut overrides = SettingOverrides::new();
        overrides.set_temporary(&mut sim, 4, 0);
        overrides.set_temporary(&mut sim, 4, 0);
        assert_eq!(overrides.records(), &[(4, 3)]);
        overrides.restore_all(&mut sim);
        assert_eq!(sim.setting(4), Some(3));
    }

    #[test]
    fn test_failed_write_is_not_fatal() {
        let mut sim = SimulatedTransport::new().with_setting(4, 1);
        sim.fail_next(Command::WriteDeviceSetting, 15);
        let mut overrides = SettingOverrides::new();
        overrides.set_temporary(&mut sim, 56, 0);
        assert_eq!(overrides.len(), 1);
    }
}
