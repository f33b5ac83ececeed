//! # rxdesk-db: Database Layer for rxdesk
//!
//! SQLite persistence for the pharmacy back-office, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         rxdesk Data Flow                                │
//! │                                                                         │
//! │  axum handler (POST /checkout)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     rxdesk-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Products      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ Batches       │    │   _schema    │  │   │
//! │  │   │ checkout lock │    │ Sales         │    │              │  │   │
//! │  │   │ BusinessClock │    │ Checkout      │    │              │  │   │
//! │  │   │               │    │ Payroll ...   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rxdesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./rxdesk.db")).await?;
//! let products = db.products().list_with_stock(None).await?;
//! let receipt = db.checkout().checkout(&principal, &lines, &payment, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::batch::{BatchRepository, NewBatch, UpdateBatch};
pub use repository::category::CategoryRepository;
pub use repository::checkout::{CheckoutReceipt, CheckoutService};
pub use repository::employee::{EmployeeRepository, NewEmployee, UpdateEmployee};
pub use repository::expense::{ExpenseFilter, ExpenseRepository, NewExpense, UpdateExpense};
pub use repository::payroll::{MarkPaid, PayrollExportRow, PayrollRepository};
pub use repository::product::{NewProduct, ProductRepository, UpdateProduct};
pub use repository::report::ReportRepository;
pub use repository::sale::{SaleFilter, SaleRepository};
pub use repository::sequence::SequenceRepository;
pub use repository::user::{NewUser, UserRecord, UserRepository};
