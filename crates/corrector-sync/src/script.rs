//! # Receipt Scripts
//!
//! Batch repairs applied to a day's receipts before they reach the register.
//! A script runs only when at least one receipt matches its filter; its
//! edit then sees the whole batch.

use std::collections::HashMap;

use corrector_core::{MeasureUnit, Receipt};
use tracing::{debug, info};

/// A repair over a batch of receipts.
pub trait ReceiptScript {
    fn name(&self) -> &str;

    /// Returns true if `receipt` needs this script.
    fn filter(&self, receipt: &Receipt) -> bool;

    /// Rewrites the batch.
    fn edit(&mut self, receipts: Vec<Receipt>) -> Vec<Receipt>;
}

/// Runs `script` over `receipts` if any receipt matches its filter.
pub fn apply_script(script: &mut dyn ReceiptScript, receipts: Vec<Receipt>) -> Vec<Receipt> {
    let matching = receipts.iter().filter(|r| script.filter(r)).count();
    if matching == 0 {
        debug!(script = script.name(), "No receipts matched");
        return receipts;
    }
    info!(script = script.name(), matching, "Applying script");
    script.edit(receipts)
}

// =============================================================================
// Measure Unit Repair
// =============================================================================

/// Fills in missing measure units (tag 2108).
///
/// Format 1.2 registers reject positions without a measure unit. Each item
/// name takes the first known unit seen for that name anywhere in the batch.
/// Names never seen with a known unit are left untouched.
#[derive(Debug, Default)]
pub struct MeasureUnitRepair {
    learned: HashMap<String, MeasureUnit>,
}

impl MeasureUnitRepair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit learned for `name`, if any.
    pub fn learned(&self, name: &str) -> Option<MeasureUnit> {
        self.learned.get(name).copied()
    }
}

impl ReceiptScript for MeasureUnitRepair {
    fn name(&self) -> &str {
        "measure-unit-repair"
    }

    fn filter(&self, receipt: &Receipt) -> bool {
        receipt.items.iter().any(|item| !item.measure_unit.is_known())
    }

    fn edit(&mut self, mut receipts: Vec<Receipt>) -> Vec<Receipt> {
        for item in receipts.iter().flat_map(|r| r.items.iter()) {
            if item.measure_unit.is_known() {
                self.learned
                    .entry(item.name.clone())
                    .or_insert(item.measure_unit);
            }
        }

        let mut repaired = 0usize;
        for item in receipts.iter_mut().flat_map(|r| r.items.iter_mut()) {
            if let Some(unit) = self.learned.get(&item.name) {
                if item.measure_unit != *unit {
                    repaired += 1;
                }
                item.measure_unit = *unit;
            }
        }
        info!(repaired, learned = self.learned.len(), "Measure units repaired");
        receipts
    }
}
