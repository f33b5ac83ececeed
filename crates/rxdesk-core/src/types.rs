//! # Domain Types
//!
//! Core domain records used throughout rxdesk.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                  Sales                    Back office          │
//! │  ───────                  ─────                    ───────────          │
//! │  Category (name unique)   Sale (invoice_number)    Employee             │
//! │  Product  ──owns──► Batch SaleItem (batch slice)   PayrollEntry         │
//! │            (cascade)      PaymentDetails           Expense              │
//! │                                                                         │
//! │  Identity: User ──token──► Principal { user_id, role }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Catalog and sales entities carry:
//! - `id`: UUID v4 - immutable, used for relations
//! - a business number (`sequential_id`, `batch_number`, `invoice_number`)
//!   issued by the counter sequences

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Identity
// =============================================================================

/// Role carried by every authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Cashier,
    Finance,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
            Role::Finance => "finance",
        }
    }
}

/// The authenticated caller of an operation.
///
/// Passed explicitly into every checkout, sales, payroll and report call;
/// nothing in rxdesk reads identity from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Principal {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Principal {
            user_id: user_id.into(),
            name: name.into(),
            role,
        }
    }

    /// True when the principal holds one of `roles`.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Admin and finance may see every sale; cashiers only their own.
    pub fn can_view_all_sales(&self) -> bool {
        self.has_any_role(&[Role::Admin, Role::Finance])
    }
}

/// A back-office user (password hash never leaves the db crate).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal::new(self.id.clone(), self.name.clone(), self.role)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
///
/// Products refer to a category by its *name* (denormalized). Renaming a
/// category leaves existing products untouched until a backfill is run.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Human-facing number from the `productId` counter.
    pub sequential_id: i64,
    pub name: String,
    /// Category name (not a foreign key).
    pub category: String,
    /// Current selling price; checkout always uses this, never batch cost.
    pub price: Money,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Product listing row with stock summed across all of its batches.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductStock {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub product: Product,
    pub total_quantity: i64,
}

/// A supplier lot of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    /// Unique, from the `batchNumber` counter (`B000042`).
    pub batch_number: String,
    pub supplier: Option<String>,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    /// Never negative; decremented only by checkout, set by admin edits.
    pub quantity: i64,
    pub cost_price: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentType {
    Cash,
    Card,
}

/// How a sale was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentDetails {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub cash_received: Option<Money>,
    pub change: Option<Money>,
}

/// One batch slice drawn by a sale.
///
/// Product name and unit price are frozen at sale time so later catalog
/// edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub product_id: String,
    pub product_name: String,
    pub batch_id: String,
    pub batch_number: String,
    /// Negative on refund records.
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A persisted sale (invoice). A negative `total` marks a refund record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `YYYYMMDD-NNNN`, business-day scoped.
    pub invoice_number: String,
    pub items: Vec<SaleItem>,
    pub sub_total: Money,
    pub total: Money,
    pub payment: PaymentDetails,
    pub cashier_id: String,
    pub notes: Option<String>,
    /// Set on refund records: the sale being refunded.
    pub refund_of: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn is_refund(&self) -> bool {
        self.total.is_negative()
    }
}

// =============================================================================
// Employees & Payroll
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Employee {
    pub id: String,
    pub name: String,
    /// Job title, e.g. "pharmacist" (unrelated to login roles).
    pub role: String,
    pub base_salary: Money,
    pub status: EmployeeStatus,
    #[ts(as = "String")]
    pub hire_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PayrollPaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
}

impl PayrollPaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PayrollPaymentMethod::Cash => "cash",
            PayrollPaymentMethod::BankTransfer => "bank_transfer",
            PayrollPaymentMethod::Cheque => "cheque",
        }
    }
}

/// One employee's pay for one `YYYY-MM` period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayrollEntry {
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub period: String,
    /// Snapshot of the employee's salary when the entry was created.
    pub base_salary: Money,
    pub advances: Money,
    pub deductions: Money,
    /// Always `max(0, base_salary - advances - deductions)`.
    pub net_pay: Money,
    pub paid: bool,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<NaiveDate>,
    pub payment_method: Option<PayrollPaymentMethod>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Supplies,
    Maintenance,
    Transport,
    Taxes,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Rent,
        ExpenseCategory::Utilities,
        ExpenseCategory::Supplies,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Transport,
        ExpenseCategory::Taxes,
        ExpenseCategory::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "rent",
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Supplies => "supplies",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Taxes => "taxes",
            ExpenseCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub category: ExpenseCategory,
    pub amount: Money,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub description: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_roles() {
        let cashier = Principal::new("u1", "Sana", Role::Cashier);
        assert!(cashier.has_any_role(&[Role::Admin, Role::Cashier]));
        assert!(!cashier.can_view_all_sales());

        let finance = Principal::new("u2", "Omar", Role::Finance);
        assert!(finance.can_view_all_sales());
    }

    #[test]
    fn test_batch_expiry_is_strict() {
        let batch = Batch {
            id: "b1".into(),
            product_id: "p1".into(),
            batch_number: "B000001".into(),
            supplier: None,
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            quantity: 5,
            cost_price: Money::from_cents(100),
            created_at: Utc::now(),
        };
        assert!(!batch.is_expired(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(batch.is_expired(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()));
    }

    #[test]
    fn test_payment_details_wire_shape() {
        let payment = PaymentDetails {
            payment_type: PaymentType::Cash,
            cash_received: Some(Money::from_cents(5000)),
            change: Some(Money::from_cents(750)),
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["type"], "cash");
        assert_eq!(json["cashReceived"], 5000);
        assert_eq!(json["change"], 750);
    }

    #[test]
    fn test_payroll_method_wire_names() {
        let json = serde_json::to_string(&PayrollPaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
        assert_eq!(PayrollPaymentMethod::BankTransfer.as_str(), "bank_transfer");
    }
}
