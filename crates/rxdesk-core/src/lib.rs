//! # rxdesk-core: Pure Business Logic for the pharmacy back-office
//!
//! Everything that decides *what* should happen lives here: which batches a
//! sale draws from, how much change a customer gets, what an employee is paid,
//! which day an invoice belongs to. Nothing in this crate touches a database,
//! a socket or the system clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        rxdesk Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/api (axum REST boundary)                   │   │
//! │  │    auth ──► role check ──► validation ──► handler               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rxdesk-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │ checkout │ │ payroll  │ │  clock   │          │   │
//! │  │   │  money   │ │  (FEFO)  │ │ net pay  │ │ biz days │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                       │   │
//! │  │   │  alerts  │ │  report  │ │ sequence │                       │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  rxdesk-db (Database Layer)                     │   │
//! │  │       SQLite repositories, counters, checkout transaction       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Batch, Sale, Employee, ...)
//! - [`money`] - Integer-cent money type
//! - [`checkout`] - FEFO allocation and checkout pricing
//! - [`payroll`] - Net pay and paid-state rules
//! - [`clock`] - Business timezone, day/month windows, period strings
//! - [`sequence`] - Counter scope keys and human-formatted numbers
//! - [`alerts`] - Expiry and low-stock classification
//! - [`report`] - Time-bucketed sales aggregation, profit
//! - [`validation`] - Field-level rules used at the REST boundary
//!
//! ## Example Usage
//!
//! ```rust
//! use rxdesk_core::money::Money;
//! use rxdesk_core::checkout::{allocate_fefo, StockLot};
//! use chrono::NaiveDate;
//!
//! let lots = vec![
//!     StockLot::new("b2", "B000002", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 5),
//!     StockLot::new("b1", "B000001", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 5),
//! ];
//! let slices = allocate_fefo(&lots, 7).unwrap();
//! assert_eq!(slices[0].batch_id, "b1");
//! assert_eq!(slices[0].quantity, 5);
//! assert_eq!(slices[1].quantity, 2);
//!
//! let price = Money::from_cents(425);
//! assert_eq!(price.multiply_quantity(10).to_string(), "42.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod checkout;
pub mod clock;
pub mod error;
pub mod money;
pub mod payroll;
pub mod report;
pub mod sequence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::BusinessClock;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct product lines in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in one checkout.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// A product whose summed batch quantity is at or below this is "low stock".
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Batches expiring within this many days are flagged as "expiring soon".
pub const DEFAULT_EXPIRING_WITHIN_DAYS: i64 = 30;
