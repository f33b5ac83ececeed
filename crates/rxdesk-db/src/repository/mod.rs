//! # Repository Module
//!
//! Database repository implementations for rxdesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                          │
//! │       │  db.products().get_by_id(id)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository { pool }                                            │
//! │  ├── list_with_stock / get_by_id / create / update / delete            │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository owns a cloned `SqlitePool`. Multi-statement operations
//! open a transaction and run every statement on it.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and password hashes
//! - [`CategoryRepository`](category::CategoryRepository) - Categories, rename backfill
//! - [`ProductRepository`](product::ProductRepository) - Products with stock totals
//! - [`BatchRepository`](batch::BatchRepository) - Supplier lots
//! - [`SequenceRepository`](sequence::SequenceRepository) - Atomic counters
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads
//! - [`CheckoutService`](checkout::CheckoutService) - Checkout and refund transactions
//! - [`EmployeeRepository`](employee::EmployeeRepository) - Staff roster
//! - [`PayrollRepository`](payroll::PayrollRepository) - Monthly payroll entries
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expense ledger
//! - [`ReportRepository`](report::ReportRepository) - Alerts and summaries

pub mod batch;
pub mod category;
pub mod checkout;
pub mod employee;
pub mod expense;
pub mod payroll;
pub mod product;
pub mod report;
pub mod sale;
pub mod sequence;
pub mod user;

use uuid::Uuid;

/// New random entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
