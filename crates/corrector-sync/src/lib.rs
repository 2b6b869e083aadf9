//! # corrector-sync: Feed, Report, and Replay for Retail Corrector
//!
//! Pulls a day of receipts from the tax portal, repairs them, replays them
//! on a fiscal register, and reports the outcome.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Replay of One Day                             │
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐              │
//! │  │ ReceiptFeed  │───►│ ReceiptScript│───►│ ReplayRunner │              │
//! │  │              │    │              │    │              │              │
//! │  │ OFD.ru API   │    │ measure unit │    │ register +   │              │
//! │  │ with backoff │    │ repair       │    │ retry policy │              │
//! │  └──────────────┘    └──────────────┘    └──────┬───────┘              │
//! │                                                 │ Counters              │
//! │                                                 ▼                       │
//! │                                          ┌──────────────┐              │
//! │                                          │  ReportSink  │              │
//! │                                          │  Planfix     │              │
//! │                                          └──────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Configuration (device, feed, report)
//! - [`error`] - Sync error types
//! - [`feed`] - `ReceiptFeed` trait and the OFD.ru client
//! - [`report`] - `ReportSink` trait and the Planfix webhook
//! - [`script`] - Batch repairs
//! - [`runner`] - Replay of a batch on a register

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod feed;
pub mod report;
pub mod runner;
pub mod script;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{CorrectorConfig, DeviceSection, FeedSettings, ReportSettings};
pub use error::{SyncError, SyncResult};
pub use feed::{parse_receipts, OfdRuFeed, ReceiptFeed};
pub use report::{PlanfixReport, ReportSink};
pub use runner::{ReplayRunner, ReplaySummary};
pub use script::{apply_script, MeasureUnitRepair, ReceiptScript};
