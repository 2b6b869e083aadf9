//! # corrector-device: Fiscal Register Protocol Layer
//!
//! Drives a certified fiscal register through its vendor interface: ordered
//! parameter writes, command executions, and an error check after each one.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          FiscalRegister<T>                              │
//! │   connect ─ open_session ─ open_receipt ─ register_item ─ close_receipt │
//! │   cancel_receipt ─ close_session ─ disconnect ─ free                    │
//! └───────────────┬──────────────────────────────────────┬──────────────────┘
//!                 │ typed values                         │ last error
//!                 ▼                                      ▼
//! ┌────────────────────────────┐        ┌────────────────────────────────────┐
//! │      ParameterMapper       │        │  classifier ──► recovery           │
//! │  Money / text / tags ──►   │        │  Continue / Fail / Compensate /    │
//! │  keyed set_param calls     │        │  RetryAfterDelay                   │
//! └──────────────┬─────────────┘        │          │                         │
//!                │                      │          ▼                         │
//!                │                      │  SettingOverrides (per connection) │
//!                │                      └──────────────┬─────────────────────┘
//!                ▼                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     DeviceTransport (trait)                             │
//! │     vendor SDK binding  │  SimulatedTransport (virtual register)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`transport`] - Transport trait, parameter values, commands
//! - [`keys`] - Numeric parameter keys and fiscal tags
//! - [`connection`] - Connection medium and its driver settings
//! - [`mapper`] - Domain values to keyed writes, vendor code tables
//! - [`classifier`] - Error code table and dispositions
//! - [`recovery`] - Compensations and busy backoff
//! - [`overrides`] - Temporary device settings
//! - [`register`] - Session and receipt lifecycle
//! - [`simulator`] - In-memory register
//!
//! ## Usage
//!
//! ```rust
//! use corrector_device::{ConnectionMedium, FiscalConnection, FiscalRegister};
//! use corrector_device::simulator::SimulatedTransport;
//!
//! let rt = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()
//!     .unwrap();
//! rt.block_on(async {
//!     let mut register = FiscalRegister::new(SimulatedTransport::new());
//!     register
//!         .connect(&FiscalConnection::new(ConnectionMedium::Usb, "/dev/usb0"))
//!         .await
//!         .unwrap();
//!     register.open_session().await.unwrap();
//!     register.close_session().await.unwrap();
//!     register.free();
//! });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod classifier;
pub mod config;
pub mod connection;
pub mod error;
pub mod keys;
pub mod mapper;
pub mod overrides;
pub mod recovery;
pub mod register;
pub mod simulator;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use classifier::{Compensation, DeviceErrorKind, Disposition, FailureClass};
pub use config::DeviceSettings;
pub use connection::{ConnectionMedium, FiscalConnection};
pub use error::{DeviceError, DeviceResult};
pub use overrides::SettingOverrides;
pub use register::{FiscalRegister, SessionState};
pub use transport::{Command, DeviceTransport, ParamValue};
