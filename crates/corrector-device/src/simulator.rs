//! # Simulated Transport
//!
//! A virtual register: accepts every command, keeps device settings in
//! memory, answers fiscal storage queries, and records every call.
//!
//! Failures are scripted per command:
//!
//! ```rust
//! use corrector_device::simulator::SimulatedTransport;
//! use corrector_device::transport::{Command, DeviceTransport};
//!
//! let mut sim = SimulatedTransport::new();
//! sim.fail_next(Command::Registration, 55);
//!
//! sim.execute(Command::Registration);
//! assert_eq!(sim.last_error_code(), 55);
//! sim.execute(Command::Registration);
//! assert_eq!(sim.last_error_code(), 0);
//! ```
//!
//! Like vendor drivers, staged parameters are dropped after each command.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use crate::classifier;
use crate::keys;
use crate::transport::{Command, DeviceTransport, ParamValue};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetParam(u32, ParamValue),
    Execute(Command),
    GetInt(u32),
    GetBytes(u32),
    SingleSetting(String, String),
    ApplySingleSettings,
    Open,
    Close,
    Destroy,
}

/// In-memory register.
#[derive(Debug)]
pub struct SimulatedTransport {
    calls: Vec<Call>,
    staged: HashMap<u32, ParamValue>,
    results: HashMap<u32, ParamValue>,
    failures: HashMap<Command, VecDeque<i32>>,
    open_failure: Option<i32>,
    last_error: i32,
    settings: BTreeMap<i64, i64>,
    single_settings: BTreeMap<String, String>,
    ffd_version: i64,
    unsent_documents: i64,
    is_open: bool,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    /// A register speaking format 1.05 with nothing pending.
    pub fn new() -> Self {
        SimulatedTransport {
            calls: Vec::new(),
            staged: HashMap::new(),
            results: HashMap::new(),
            failures: HashMap::new(),
            open_failure: None,
            last_error: 0,
            settings: BTreeMap::new(),
            single_settings: BTreeMap::new(),
            ffd_version: 105,
            unsent_documents: 0,
            is_open: false,
        }
    }

    pub fn with_ffd_version(mut self, version: i64) -> Self {
        self.ffd_version = version;
        self
    }

    pub fn with_unsent_documents(mut self, count: i64) -> Self {
        self.unsent_documents = count;
        self
    }

    pub fn with_setting(mut self, id: i64, value: i64) -> Self {
        self.settings.insert(id, value);
        self
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// The next execution of `command` reports `code`.
    pub fn fail_next(&mut self, command: Command, code: i32) {
        self.failures.entry(command).or_default().push_back(code);
    }

    /// The next `times` executions of `command` report `code`.
    pub fn fail_times(&mut self, command: Command, code: i32, times: usize) {
        let queue = self.failures.entry(command).or_default();
        queue.extend(std::iter::repeat(code).take(times));
    }

    /// Opening the link reports `code`.
    pub fn fail_open(&mut self, code: i32) {
        self.open_failure = Some(code);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Keys of every `set_param` call, in order.
    pub fn param_keys(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::SetParam(key, _) => Some(*key),
                _ => None,
            })
            .collect()
    }

    /// Every executed command, in order.
    pub fn executed(&self) -> Vec<Command> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Execute(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, command: Command) -> usize {
        self.executed().iter().filter(|c| **c == command).count()
    }

    /// Current value of a device setting.
    pub fn setting(&self, id: i64) -> Option<i64> {
        self.settings.get(&id).copied()
    }

    /// Applied connection settings.
    pub fn single_setting(&self, key: &str) -> Option<&str> {
        self.single_settings.get(key).map(String::as_str)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    // =========================================================================
    // Device Behavior
    // =========================================================================

    fn staged_int(&self, key: u32) -> i64 {
        self.staged.get(&key).and_then(ParamValue::as_int).unwrap_or(0)
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::FnQueryData => match self.staged_int(keys::FN_DATA_TYPE) {
                keys::FN_DATA_FFD_VERSIONS => {
                    self.results
                        .insert(keys::FFD_VERSION, ParamValue::Int(self.ffd_version));
                }
                keys::FN_DATA_OFD_EXCHANGE_STATUS => {
                    self.results
                        .insert(keys::DOCUMENTS_COUNT, ParamValue::Int(self.unsent_documents));
                }
                _ => {}
            },
            Command::UtilFormTlv => {
                let blob = self.form_tlv();
                self.results.insert(keys::TAG_VALUE, ParamValue::Bytes(blob));
            }
            Command::ReadDeviceSetting => {
                let id = self.staged_int(keys::SETTING_ID);
                let value = self.settings.get(&id).copied().unwrap_or(0);
                self.results.insert(keys::SETTING_VALUE, ParamValue::Int(value));
            }
            Command::WriteDeviceSetting => {
                let id = self.staged_int(keys::SETTING_ID);
                let value = self.staged_int(keys::SETTING_VALUE);
                self.settings.insert(id, value);
            }
            _ => {}
        }
    }

    /// Tag (u16 LE), length (u16 LE), value for each staged tag, in tag order.
    fn form_tlv(&self) -> Vec<u8> {
        let mut tags: Vec<(&u32, &ParamValue)> =
            self.staged.iter().filter(|(key, _)| **key < 10_000).collect();
        tags.sort_by_key(|(key, _)| **key);

        let mut blob = Vec::new();
        for (tag, value) in tags {
            let bytes = match value {
                ParamValue::Text(s) => s.as_bytes().to_vec(),
                ParamValue::DateTime(dt) => (dt.and_utc().timestamp() as u32).to_le_bytes().to_vec(),
                ParamValue::Int(v) => (*v as u32).to_le_bytes().to_vec(),
                ParamValue::Bytes(b) => b.clone(),
                _ => continue,
            };
            blob.extend_from_slice(&(*tag as u16).to_le_bytes());
            blob.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
            blob.extend_from_slice(&bytes);
        }
        blob
    }
}

impl DeviceTransport for SimulatedTransport {
    fn set_param(&mut self, key: u32, value: ParamValue) {
        self.calls.push(Call::SetParam(key, value.clone()));
        self.staged.insert(key, value);
    }

    fn execute(&mut self, command: Command) {
        self.calls.push(Call::Execute(command));

        let failure = self
            .failures
            .get_mut(&command)
            .and_then(VecDeque::pop_front);

        match failure {
            Some(code) => {
                debug!(command = %command, code, "simulated failure");
                self.last_error = code;
            }
            None => {
                self.last_error = 0;
                self.run(command);
            }
        }
        self.staged.clear();
    }

    fn get_param_int(&mut self, key: u32) -> i64 {
        self.calls.push(Call::GetInt(key));
        self.results.get(&key).and_then(ParamValue::as_int).unwrap_or(0)
    }

    fn get_param_bytes(&mut self, key: u32) -> Vec<u8> {
        self.calls.push(Call::GetBytes(key));
        match self.results.get(&key) {
            Some(ParamValue::Bytes(bytes)) => bytes.clone(),
            _ => Vec::new(),
        }
    }

    fn last_error_code(&self) -> i32 {
        self.last_error
    }

    fn last_error_text(&self) -> String {
        classifier::describe(self.last_error).to_string()
    }

    fn set_single_setting(&mut self, key: &str, value: &str) {
        self.calls
            .push(Call::SingleSetting(key.to_string(), value.to_string()));
        self.single_settings.insert(key.to_string(), value.to_string());
    }

    fn apply_single_settings(&mut self) {
        self.calls.push(Call::ApplySingleSettings);
    }

    fn open(&mut self) {
        self.calls.push(Call::Open);
        match self.open_failure {
            Some(code) => self.last_error = code,
            None => {
                self.last_error = 0;
                self.is_open = true;
            }
        }
    }

    fn close(&mut self) {
        self.calls.push(Call::Close);
        self.last_error = 0;
        self.is_open = false;
    }

    fn destroy(&mut self) {
        self.calls.push(Call::Destroy);
        self.is_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_failures_are_consumed() {
        let mut sim = SimulatedTransport::new();
        sim.fail_times(Command::Payment, 66, 2);
        sim.execute(Command::Payment);
        assert_eq!(sim.last_error_code(), 66);
        assert_eq!(sim.last_error_text(), "Receipt not fully paid");
        sim.execute(Command::Payment);
        assert_eq!(sim.last_error_code(), 66);
        sim.execute(Command::Payment);
        assert_eq!(sim.last_error_code(), 0);
        assert_eq!(sim.count(Command::Payment), 3);
    }

    #[test]
    fn test_device_settings_round_trip() {
        let mut sim = SimulatedTransport::new().with_setting(56, 1);
        sim.set_param(keys::SETTING_ID, ParamValue::Int(56));
        sim.execute(Command::ReadDeviceSetting);
        assert_eq!(sim.get_param_int(keys::SETTING_VALUE), 1);

        sim.set_param(keys::SETTING_ID, ParamValue::Int(56));
        sim.set_param(keys::SETTING_VALUE, ParamValue::Int(0));
        sim.execute(Command::WriteDeviceSetting);
        assert_eq!(sim.setting(56), Some(0));
    }

    #[test]
    fn test_ffd_query() {
        let mut sim = SimulatedTransport::new().with_ffd_version(120);
        sim.set_param(keys::FN_DATA_TYPE, ParamValue::Int(keys::FN_DATA_FFD_VERSIONS));
        sim.execute(Command::FnQueryData);
        assert_eq!(sim.get_param_int(keys::FFD_VERSION), 120);
    }

    #[test]
    fn test_tlv_blob() {
        let mut sim = SimulatedTransport::new();
        sim.set_param(keys::TAG_CORRECTION_DOC_NUMBER, ParamValue::Text("12".into()));
        sim.execute(Command::UtilFormTlv);
        let blob = sim.get_param_bytes(keys::TAG_VALUE);
        // 1179 = 0x049B
        assert_eq!(blob, vec![0x9B, 0x04, 0x02, 0x00, b'1', b'2']);
    }

    #[test]
    fn test_staged_params_cleared_after_execute() {
        let mut sim = SimulatedTransport::new().with_setting(4, 9);
        sim.set_param(keys::SETTING_ID, ParamValue::Int(4));
        sim.execute(Command::CancelReceipt);
        sim.execute(Command::ReadDeviceSetting);
        // Setting id fell back to 0, which holds nothing
        assert_eq!(sim.get_param_int(keys::SETTING_VALUE), 0);
    }

    #[test]
    fn test_open_failure() {
        let mut sim = SimulatedTransport::new();
        sim.fail_open(2);
        sim.open();
        assert_eq!(sim.last_error_code(), 2);
        assert!(!sim.is_open());
    }
}
