//! # corrector-core: Receipt Model for Retail Corrector
//!
//! This crate holds the receipt model shared by the device layer and the
//! feed/report layer. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Retail Corrector Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                OFD feed (corrector-sync)                        │   │
//! │  │        JSON receipts-info ──► Vec<Receipt>                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ corrector-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │   money   │  │ validation│                  │   │
//! │  │   │  Receipt  │  │   Money   │  │   rules   │                  │   │
//! │  │   │  LineItem │  │ (kopecks) │  │   checks  │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DEVICE • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          corrector-device (fiscal register protocol)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Receipt, line item, payment, operation, correction data
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Caller-side receipt checks
//!
//! ## Example Usage
//!
//! ```rust
//! use corrector_core::money::Money;
//!
//! let price = Money::from_kopecks(12_050); // 120.50
//! let line_total = price.times_quantity(2.0);
//! assert_eq!(line_total.kopecks(), 24_100);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a commodity name accepted by fiscal storage (tag 1030).
pub const MAX_ITEM_NAME_CHARS: usize = 128;

/// Maximum number of line items on a single receipt.
pub const MAX_RECEIPT_ITEMS: usize = 1000;
