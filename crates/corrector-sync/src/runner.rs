//! # Replay Runner
//!
//! Fiscalizes a batch of receipts in one shift.
//!
//! ## Per-Receipt Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Outcome of open → register items → close                              │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  Ok                  success += 1                                      │
//! │  TransientBusy       cancel if open, replay again (max_busy_retries)   │
//! │  ReceiptFormat       cancel, count as failed, next receipt             │
//! │  Device              cancel if open, count as failed, next receipt     │
//! │  FatalHardware       stop the batch                                    │
//! │                                                                         │
//! │  Receipts failing validation never reach the register.                 │
//! │  The register is always disconnected at the end.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use corrector_core::validation::validate_receipt;
use corrector_core::{Counters, Receipt};
use corrector_device::{
    DeviceError, DeviceResult, DeviceTransport, FiscalConnection, FiscalRegister, SessionState,
};
use tracing::{debug, error, info, warn};

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub counters: Counters,
    /// The error that stopped the batch early.
    pub fatal: Option<DeviceError>,
}

impl ReplaySummary {
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Drives one register through a batch of receipts.
pub struct ReplayRunner<T: DeviceTransport> {
    register: FiscalRegister<T>,
    connection: FiscalConnection,
    max_busy_retries: u32,
}

impl<T: DeviceTransport> ReplayRunner<T> {
    pub fn new(register: FiscalRegister<T>, connection: FiscalConnection, max_busy_retries: u32) -> Self {
        ReplayRunner {
            register,
            connection,
            max_busy_retries,
        }
    }

    pub fn register(&self) -> &FiscalRegister<T> {
        &self.register
    }

    /// Hands the register back, e.g. to `free` it once the batch is done.
    pub fn into_register(self) -> FiscalRegister<T> {
        self.register
    }

    /// Connects, opens a shift, replays every receipt, closes the shift and
    /// disconnects.
    pub async fn run(&mut self, receipts: &[Receipt]) -> ReplaySummary {
        let mut counters = Counters {
            success: 0,
            total: receipts.len() as u32,
        };

        let fatal = self.run_session(receipts, &mut counters).await.err();
        self.register.disconnect();

        match &fatal {
            Some(e) => error!(error = %e, success = counters.success, total = counters.total, "Replay stopped"),
            None => info!(
                success = counters.success,
                failed = counters.failed(),
                total = counters.total,
                "Replay finished"
            ),
        }

        ReplaySummary { counters, fatal }
    }

    async fn run_session(&mut self, receipts: &[Receipt], counters: &mut Counters) -> DeviceResult<()> {
        self.register.connect(&self.connection).await?;

        if let Err(e) = self.register.open_session().await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(error = %e, "Opening the shift failed, continuing");
        }

        for receipt in receipts {
            if let Err(e) = validate_receipt(receipt) {
                warn!(document = receipt.document_number, error = %e, "Receipt skipped");
                continue;
            }

            match self.replay_with_retry(receipt).await {
                Ok(()) => counters.success += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(document = receipt.document_number, error = %e, "Receipt failed");
                }
            }
        }

        if let Err(e) = self.register.close_session().await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(error = %e, "Closing the shift failed");
        }
        Ok(())
    }

    async fn replay_with_retry(&mut self, receipt: &Receipt) -> DeviceResult<()> {
        let mut attempt = 0u32;
        loop {
            let result = self.replay_once(receipt).await;
            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if err.is_fatal() {
                return Err(err);
            }

            if self.register.state() == SessionState::ReceiptOpen {
                if let Err(cancel) = self.register.cancel_receipt().await {
                    warn!(error = %cancel, "Cancelling the receipt failed");
                    if cancel.is_fatal() {
                        return Err(cancel);
                    }
                }
            }

            if err.is_retryable() && attempt < self.max_busy_retries {
                attempt += 1;
                debug!(document = receipt.document_number, attempt, "Replaying receipt again");
                continue;
            }
            return Err(err);
        }
    }

    async fn replay_once(&mut self, receipt: &Receipt) -> DeviceResult<()> {
        self.register.open_receipt(receipt).await?;
        for item in &receipt.items {
            self.register.register_item(item).await?;
        }
        self.register
            .close_receipt(&receipt.payment, receipt.total)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corrector_core::{LineItem, MeasureUnit, Money, Operation, Payment, TaxRate};
    use corrector_device::simulator::{Call, SimulatedTransport};
    use corrector_device::{Command, ConnectionMedium};
    use std::time::Duration;

    fn receipt(number: u32) -> Receipt {
        Receipt {
            document_number: number,
            total: Money::from_kopecks(5_000),
            items: vec![LineItem {
                name: format!("Item {number}"),
                price: Money::from_kopecks(5_000),
                quantity: 1.0,
                total: Money::from_kopecks(5_000),
                tax_rate: TaxRate::Vat20,
                measure_unit: MeasureUnit::PIECE,
                payment_method: 4,
                subject_type: 1,
            }],
            payment: Payment {
                cash: Money::from_kopecks(5_000),
                ..Payment::default()
            },
            operation: Operation::INCOME,
            correction: None,
        }
    }

    fn runner(sim: SimulatedTransport, retries: u32) -> ReplayRunner<SimulatedTransport> {
        ReplayRunner::new(
            FiscalRegister::new(sim),
            FiscalConnection::new(ConnectionMedium::Usb, "/dev/usb0"),
            retries,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_receipts_succeed() {
        let mut runner = runner(SimulatedTransport::new(), 3);
        let summary = runner.run(&[receipt(1), receipt(2)]).await;

        assert_eq!(summary.counters, Counters { success: 2, total: 2 });
        assert!(summary.is_complete());
        let sim = runner.register().transport();
        assert_eq!(sim.count(Command::OpenShift), 1);
        assert_eq!(sim.count(Command::CloseReceipt), 2);
        assert_eq!(sim.count(Command::Report), 1);
        assert!(!sim.is_open());
        assert_eq!(runner.register().state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_format_error_cancels_and_continues() {
        let mut sim = SimulatedTransport::new();
        sim.fail_next(Command::CloseReceipt, 66);
        let mut runner = runner(sim, 3);
        let summary = runner.run(&[receipt(1), receipt(2)]).await;

        assert_eq!(summary.counters, Counters { success: 1, total: 2 });
        assert_eq!(runner.register().transport().count(Command::CancelReceipt), 1);
        assert_eq!(runner.register().transport().count(Command::OpenReceipt), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_receipt_is_replayed() {
        let mut sim = SimulatedTransport::new();
        sim.fail_next(Command::Registration, 55);
        let mut runner = runner(sim, 3);

        let start = tokio::time::Instant::now();
        let summary = runner.run(&[receipt(1)]).await;

        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(summary.counters, Counters { success: 1, total: 1 });
        let sim = runner.register().transport();
        assert_eq!(sim.count(Command::CancelReceipt), 1);
        assert_eq!(sim.count(Command::OpenReceipt), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_retries_exhausted() {
        let mut sim = SimulatedTransport::new();
        sim.fail_times(Command::Registration, 55, 3);
        let mut runner = runner(sim, 2);
        let summary = runner.run(&[receipt(1)]).await;

        assert_eq!(summary.counters, Counters { success: 0, total: 1 });
        assert!(summary.is_complete());
        assert_eq!(runner.register().transport().count(Command::OpenReceipt), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_batch() {
        let mut sim = SimulatedTransport::new();
        sim.fail_next(Command::OpenReceipt, 0);
        sim.fail_next(Command::OpenReceipt, 44);
        let mut runner = runner(sim, 3);
        let summary = runner.run(&[receipt(1), receipt(2), receipt(3)]).await;

        assert_eq!(summary.counters, Counters { success: 1, total: 3 });
        assert!(matches!(
            summary.fatal,
            Some(DeviceError::FatalHardware { code: 44, .. })
        ));
        let sim = runner.register().transport();
        assert_eq!(sim.count(Command::OpenReceipt), 2);
        assert_eq!(sim.count(Command::Report), 0);
        assert!(!sim.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_reported() {
        let mut sim = SimulatedTransport::new();
        sim.fail_open(2);
        let mut runner = runner(sim, 3);
        let summary = runner.run(&[receipt(1)]).await;

        assert_eq!(summary.counters, Counters { success: 0, total: 1 });
        assert!(summary.fatal.as_ref().is_some_and(DeviceError::is_fatal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_receipt_never_reaches_register() {
        let mut bad = receipt(1);
        bad.items.clear();
        let mut runner = runner(SimulatedTransport::new(), 3);
        let summary = runner.run(&[bad, receipt(2)]).await;

        assert_eq!(summary.counters, Counters { success: 1, total: 2 });
        assert_eq!(runner.register().transport().count(Command::OpenReceipt), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrides_restored_after_batch() {
        let mut sim = SimulatedTransport::new().with_setting(4, 1).with_setting(56, 1);
        sim.fail_next(Command::Payment, 80);
        let mut runner = runner(sim, 3);
        let summary = runner.run(&[receipt(1), receipt(2)]).await;

        assert_eq!(summary.counters, Counters { success: 1, total: 2 });
        let register = runner.register();
        assert!(register.overrides().is_empty());
        assert_eq!(register.transport().setting(56), Some(1));
        assert_eq!(register.transport().setting(4), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_freed_register_releases_driver_handle() {
        let mut sim = SimulatedTransport::new();
        let mut runner = ReplayRunner::new(
            FiscalRegister::new(&mut sim),
            FiscalConnection::new(ConnectionMedium::Usb, "/dev/usb0"),
            3,
        );
        let summary = runner.run(&[receipt(1)]).await;
        assert!(summary.is_complete());
        runner.into_register().free();

        assert_eq!(sim.calls().last(), Some(&Call::Destroy));
        assert_eq!(sim.count(Command::CloseReceipt), 1);
    }
}
