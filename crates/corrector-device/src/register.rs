//! # Fiscal Register
//!
//! Session and receipt lifecycle over a [`DeviceTransport`].
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Disconnected ──connect──► Connected ──open_session──► ShiftOpen        │
//! │       ▲                        ▲                        │    ▲          │
//! │       │                        │                open_receipt │          │
//! │   disconnect              close_session                 ▼    │          │
//! │       │                        │                   ReceiptOpen          │
//! │       └──── any state ─────────┘                 register_item* │       │
//! │                                                  close_receipt ─┘       │
//! │                                                  cancel_receipt ┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The state is tracked for diagnostics and compensation bookkeeping; the
//! device is the authority on which transitions are legal.
//!
//! Every command is followed by an error check. Compensations (restart or
//! reopen the shift, zero the cash-control settings) run before the error is
//! returned, so the caller only decides whether to retry or rebuild.

use corrector_core::{LineItem, Money, Payment, Receipt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{self, Compensation, Disposition};
use crate::config::DeviceSettings;
use crate::connection::FiscalConnection;
use crate::error::DeviceResult;
use crate::keys;
use crate::mapper::{self, ParameterMapper};
use crate::overrides::SettingOverrides;
use crate::recovery;
use crate::transport::{Command, DeviceTransport, ObservedError};

/// Where the register is in the fiscal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connected,
    ShiftOpen,
    ReceiptOpen,
}

/// A fiscal register driven through its transport.
///
/// Owns the transport and the per-connection setting overrides. Dropping a
/// connected register restores overrides and closes the link; [`free`]
/// additionally releases the driver handle.
///
/// [`free`]: FiscalRegister::free
pub struct FiscalRegister<T: DeviceTransport> {
    transport: T,
    settings: DeviceSettings,
    overrides: SettingOverrides,
    state: SessionState,
    fiscal_format: Option<i64>,
}

impl<T: DeviceTransport> FiscalRegister<T> {
    pub fn new(transport: T) -> Self {
        Self::with_settings(transport, DeviceSettings::default())
    }

    pub fn with_settings(transport: T, settings: DeviceSettings) -> Self {
        FiscalRegister {
            transport,
            settings,
            overrides: SettingOverrides::new(),
            state: SessionState::Disconnected,
            fiscal_format: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn overrides(&self) -> &SettingOverrides {
        &self.overrides
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn mapper(&mut self) -> ParameterMapper<'_, T> {
        ParameterMapper::new(&mut self.transport)
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    async fn execute(&mut self, command: Command) -> DeviceResult<()> {
        debug!(command = %command, "Executing");
        self.transport.execute(command);
        self.check(command.name()).await
    }

    /// Classifies the last error and applies its disposition.
    async fn check(&mut self, operation: &str) -> DeviceResult<()> {
        let observed = ObservedError::read(&self.transport);
        let disposition = classifier::classify(observed.code);

        let result = recovery::resolve(
            &mut self.transport,
            &mut self.overrides,
            &self.settings,
            operation,
            observed,
        )
        .await;

        if let Disposition::CompensateThenFail(
            Compensation::RestartShift | Compensation::ReopenShift,
        ) = disposition
        {
            if self.state != SessionState::Disconnected {
                self.state = SessionState::ShiftOpen;
            }
        }

        result
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Configures the medium and opens the link.
    pub async fn connect(&mut self, connection: &FiscalConnection) -> DeviceResult<()> {
        let settings = connection.single_settings()?;
        for (key, value) in &settings {
            self.transport.set_single_setting(key, value);
        }
        self.transport.apply_single_settings();
        self.transport.open();
        self.check("open").await?;

        self.state = SessionState::Connected;
        self.fiscal_format = None;
        info!(
            medium = %connection.medium,
            address = %connection.address,
            "Connected to fiscal register"
        );
        Ok(())
    }

    /// Restores overrides, forgets the cached format, closes the link.
    ///
    /// Overrides recorded by a failed `connect` are restored too; the link
    /// is only closed when it was opened.
    pub fn disconnect(&mut self) {
        self.overrides.restore_all(&mut self.transport);
        self.fiscal_format = None;
        if self.state == SessionState::Disconnected {
            return;
        }

        self.transport.close();

        let observed = ObservedError::read(&self.transport);
        if !observed.is_ok() {
            warn!(code = observed.code, text = %observed.text, "Closing the link failed");
        }
        self.state = SessionState::Disconnected;
        info!("Disconnected from fiscal register");
    }

    /// Disconnects and releases the driver handle.
    pub fn free(mut self) {
        self.disconnect();
        self.transport.destroy();
    }

    // =========================================================================
    // Shift
    // =========================================================================

    pub async fn open_session(&mut self) -> DeviceResult<()> {
        self.mapper().write_open_shift();
        self.execute(Command::OpenShift).await?;
        self.state = SessionState::ShiftOpen;
        info!("Shift opened");
        Ok(())
    }

    /// Closes the shift with the shift-close report.
    pub async fn close_session(&mut self) -> DeviceResult<()> {
        self.mapper().write_close_shift();
        self.execute(Command::Report).await?;
        self.state = SessionState::Connected;
        info!("Shift closed");
        Ok(())
    }

    // =========================================================================
    // Receipt
    // =========================================================================

    /// Opens an ordinary or correction receipt.
    pub async fn open_receipt(&mut self, receipt: &Receipt) -> DeviceResult<()> {
        match &receipt.correction {
            None => {
                let code = mapper::receipt_type_code(receipt.operation, false);
                self.mapper().set_int(keys::RECEIPT_TYPE, code);
            }
            Some(correction) => {
                self.mapper().write_correction_basis(correction);
                self.execute(Command::UtilFormTlv).await?;
                let basis = self.mapper().get_bytes(keys::TAG_VALUE);
                self.mapper()
                    .write_correction_header(receipt.operation, correction, basis);
            }
        }

        self.execute(Command::OpenReceipt).await?;
        self.state = SessionState::ReceiptOpen;
        debug!(
            document = receipt.document_number,
            correction = receipt.is_correction(),
            "Receipt opened"
        );
        Ok(())
    }

    /// Registers one position on the open receipt.
    pub async fn register_item(&mut self, item: &LineItem) -> DeviceResult<()> {
        let with_measure_unit = self.fiscal_format().await? == keys::FFD_1_2;
        self.mapper().write_item(item, with_measure_unit);
        self.execute(Command::Registration).await
    }

    /// Totals the receipt, applies every positive payment component in
    /// order, and closes it.
    pub async fn close_receipt(&mut self, payment: &Payment, total: Money) -> DeviceResult<()> {
        self.mapper().set_money(keys::RECEIPT_SUM, total);
        self.execute(Command::ReceiptTotal).await?;

        let components = mapper::payment_components(payment, self.settings.provision_uses_cash_sum);
        for (kind, sum) in components {
            self.mapper().write_payment(kind, sum);
            self.execute(Command::Payment).await?;
        }

        self.execute(Command::CloseReceipt).await?;
        self.state = SessionState::ShiftOpen;
        debug!(%total, "Receipt closed");
        Ok(())
    }

    pub async fn cancel_receipt(&mut self) -> DeviceResult<()> {
        let result = self.execute(Command::CancelReceipt).await;
        self.state = SessionState::ShiftOpen;
        result
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fiscal data format version (e.g. 105, 110, 120).
    ///
    /// Queried once per connection.
    pub async fn fiscal_format(&mut self) -> DeviceResult<i64> {
        if let Some(format) = self.fiscal_format {
            return Ok(format);
        }
        self.mapper()
            .set_int(keys::FN_DATA_TYPE, keys::FN_DATA_FFD_VERSIONS);
        self.execute(Command::FnQueryData).await?;
        let format = self.mapper().get_int(keys::FFD_VERSION);
        debug!(format, "Fiscal format");
        self.fiscal_format = Some(format);
        Ok(format)
    }

    /// Number of documents not yet delivered to the fiscal data operator.
    pub async fn unsent_documents(&mut self) -> DeviceResult<i64> {
        self.mapper()
            .set_int(keys::FN_DATA_TYPE, keys::FN_DATA_OFD_EXCHANGE_STATUS);
        self.execute(Command::FnQueryData).await?;
        Ok(self.mapper().get_int(keys::DOCUMENTS_COUNT))
    }
}

impl<T: DeviceTransport> Drop for FiscalRegister<T> {
    fn drop(&mut self) {
        if self.state != SessionState::Disconnected || !self.overrides.is_empty() {
            warn!(state = ?self.state, "Register dropped while connected");
            self.disconnect();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
