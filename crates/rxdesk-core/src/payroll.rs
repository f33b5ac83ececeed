//! # Payroll Rules
//!
//! Net pay arithmetic and the paid/unpaid state rules of a payroll entry.
//!
//! ```text
//! netPay = max(0, baseSalary - advances - deductions)
//!
//! paid = true   → paymentMethod required, paidDate defaults to today
//! paid = false  → paymentMethod and paidDate cleared
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PayrollEntry, PayrollPaymentMethod};
use crate::validation::validate_amount;

/// Net pay, never below zero.
///
/// ```rust
/// use rxdesk_core::money::Money;
/// use rxdesk_core::payroll::net_pay;
///
/// let net = net_pay(Money::from_cents(4_000_000), Money::from_cents(125_050), Money::zero());
/// assert_eq!(net.to_string(), "38749.50");
/// assert_eq!(net_pay(Money::from_cents(100), Money::from_cents(500), Money::zero()), Money::zero());
/// ```
pub fn net_pay(base_salary: Money, advances: Money, deductions: Money) -> Money {
    (base_salary - advances - deductions).floor_zero()
}

/// Partial update of an entry's amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PayrollAmendment {
    pub base_salary: Option<Money>,
    pub advances: Option<Money>,
    pub deductions: Option<Money>,
}

impl PayrollAmendment {
    /// Applies the amendment and recomputes net pay.
    ///
    /// Negative amounts are rejected before anything changes.
    pub fn apply(&self, entry: &mut PayrollEntry) -> Result<(), ValidationError> {
        if let Some(base) = self.base_salary {
            validate_amount("baseSalary", base)?;
        }
        if let Some(advances) = self.advances {
            validate_amount("advances", advances)?;
        }
        if let Some(deductions) = self.deductions {
            validate_amount("deductions", deductions)?;
        }

        if let Some(base) = self.base_salary {
            entry.base_salary = base;
        }
        if let Some(advances) = self.advances {
            entry.advances = advances;
        }
        if let Some(deductions) = self.deductions {
            entry.deductions = deductions;
        }
        entry.net_pay = net_pay(entry.base_salary, entry.advances, entry.deductions);
        Ok(())
    }
}

/// Resolved paid state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaidState {
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub payment_method: Option<PayrollPaymentMethod>,
}

/// Resolves a mark-paid / mark-unpaid request.
///
/// ```rust
/// use chrono::NaiveDate;
/// use rxdesk_core::payroll::resolve_paid_state;
/// use rxdesk_core::types::PayrollPaymentMethod;
///
/// let today = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
/// assert!(resolve_paid_state(true, None, None, today).is_err());
///
/// let state = resolve_paid_state(true, None, Some(PayrollPaymentMethod::Cash), today).unwrap();
/// assert_eq!(state.paid_date, Some(today));
///
/// let cleared = resolve_paid_state(false, Some(today), Some(PayrollPaymentMethod::Cash), today).unwrap();
/// assert_eq!((cleared.paid_date, cleared.payment_method), (None, None));
/// ```
pub fn resolve_paid_state(
    paid: bool,
    paid_date: Option<NaiveDate>,
    payment_method: Option<PayrollPaymentMethod>,
    today: NaiveDate,
) -> Result<PaidState, ValidationError> {
    if !paid {
        return Ok(PaidState {
            paid: false,
            paid_date: None,
            payment_method: None,
        });
    }

    let method = payment_method.ok_or_else(|| ValidationError::required("paymentMethod"))?;
    Ok(PaidState {
        paid: true,
        paid_date: Some(paid_date.unwrap_or(today)),
        payment_method: Some(method),
    })
}
