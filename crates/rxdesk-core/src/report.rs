//! # Reporting Aggregations
//!
//! Time-bucketed sales sums and the profit/loss summary. The db crate
//! fetches the raw facts for a window; this module does the arithmetic.
//!
//! ## Summary Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  period=monthly (business clock: 2025-10)                               │
//! │                                                                         │
//! │   grossSales     Σ total of sales with total > 0                       │
//! │   refunds        Σ |total| of sales with total < 0                     │
//! │   totalSales     grossSales - refunds                                  │
//! │   totalExpenses  Σ expense.amount, date in window                      │
//! │   payrollPaid    Σ netPay, paid and paidDate in window                 │
//! │   ─────────────────────────────────────────────                        │
//! │   netProfit      totalSales - (totalExpenses + payrollPaid)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::clock::{week_start, BusinessClock, Period};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::ExpenseCategory;

// =============================================================================
// Granularity & Period
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// First date of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => week_start(date),
            Granularity::Month => Period::containing(date).first_day(),
        }
    }

    fn next_bucket(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => start + Duration::days(1),
            Granularity::Week => start + Duration::days(7),
            Granularity::Month => Period::containing(start).next().first_day(),
        }
    }
}

/// Reporting window selector for the summary endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SummaryPeriod {
    Daily,
    Monthly,
    Yearly,
}

impl SummaryPeriod {
    /// Inclusive business-date range and bucket size for the period that
    /// contains `today`.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate, Granularity) {
        match self {
            SummaryPeriod::Daily => (today, today, Granularity::Day),
            SummaryPeriod::Monthly => {
                let period = Period::containing(today);
                (period.first_day(), period.last_day(), Granularity::Day)
            }
            SummaryPeriod::Yearly => {
                let first = today.with_ordinal(1).unwrap_or(today);
                let last = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                (first, last, Granularity::Month)
            }
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SummaryPeriod::Daily => "daily",
            SummaryPeriod::Monthly => "monthly",
            SummaryPeriod::Yearly => "yearly",
        }
    }
}

impl fmt::Display for SummaryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(SummaryPeriod::Daily),
            "monthly" => Ok(SummaryPeriod::Monthly),
            "yearly" => Ok(SummaryPeriod::Yearly),
            _ => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: vec!["daily".into(), "monthly".into(), "yearly".into()],
            }),
        }
    }
}

// =============================================================================
// Sales Buckets
// =============================================================================

/// The two columns of a sale that reports need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleFact {
    pub created_at: DateTime<Utc>,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesBucket {
    #[ts(as = "String")]
    pub start: NaiveDate,
    pub gross: Money,
    /// Positive magnitude of refunds.
    pub refunds: Money,
    pub net: Money,
    pub count: i64,
}

impl SalesBucket {
    fn empty(start: NaiveDate) -> Self {
        SalesBucket {
            start,
            gross: Money::zero(),
            refunds: Money::zero(),
            net: Money::zero(),
            count: 0,
        }
    }

    fn add(&mut self, total: Money) {
        if total.is_negative() {
            self.refunds += total.abs();
        } else {
            self.gross += total;
        }
        self.net += total;
        self.count += 1;
    }
}

/// Buckets sales over the inclusive business dates `from..=to`.
///
/// Every bucket in range is present, empty ones included. Sales whose
/// business date falls outside the range are ignored.
pub fn bucket_sales(
    facts: &[SaleFact],
    clock: &BusinessClock,
    granularity: Granularity,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<SalesBucket> {
    let mut buckets: BTreeMap<NaiveDate, SalesBucket> = BTreeMap::new();

    let mut start = granularity.bucket_start(from);
    while start <= to {
        buckets.insert(start, SalesBucket::empty(start));
        start = granularity.next_bucket(start);
    }

    for fact in facts {
        let date = clock.local_date(fact.created_at);
        if date < from || date > to {
            continue;
        }
        let key = granularity.bucket_start(date);
        buckets
            .entry(key)
            .or_insert_with(|| SalesBucket::empty(key))
            .add(fact.total);
    }

    buckets.into_values().collect()
}

// =============================================================================
// Profit Summary
// =============================================================================

/// `totalSales - (totalExpenses + totalPayrollPaid)`.
pub fn net_profit(total_sales: Money, total_expenses: Money, total_payroll_paid: Money) -> Money {
    total_sales - (total_expenses + total_payroll_paid)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FinancialSummary {
    pub period: SummaryPeriod,
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
    pub gross_sales: Money,
    pub refunds: Money,
    pub total_sales: Money,
    pub sales_count: i64,
    pub total_expenses: Money,
    pub total_payroll_paid: Money,
    pub net_profit: Money,
    pub buckets: Vec<SalesBucket>,
}

impl FinancialSummary {
    pub fn build(
        period: SummaryPeriod,
        from: NaiveDate,
        to: NaiveDate,
        buckets: Vec<SalesBucket>,
        total_expenses: Money,
        total_payroll_paid: Money,
    ) -> Self {
        let gross_sales: Money = buckets.iter().map(|b| b.gross).sum();
        let refunds: Money = buckets.iter().map(|b| b.refunds).sum();
        let total_sales = gross_sales - refunds;
        let sales_count = buckets.iter().map(|b| b.count).sum();

        FinancialSummary {
            period,
            from,
            to,
            gross_sales,
            refunds,
            total_sales,
            sales_count,
            total_expenses,
            total_payroll_paid,
            net_profit: net_profit(total_sales, total_expenses, total_payroll_paid),
            buckets,
        }
    }
}

// =============================================================================
// Expense Summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: Money,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpenseSummary {
    #[ts(as = "String")]
    pub period: Period,
    pub total: Money,
    pub by_category: Vec<CategoryTotal>,
}

/// Totals `(category, amount)` pairs; categories with no expenses are omitted.
pub fn summarize_expenses(
    period: Period,
    amounts: impl IntoIterator<Item = (ExpenseCategory, Money)>,
) -> ExpenseSummary {
    let mut totals: BTreeMap<ExpenseCategory, (Money, i64)> = BTreeMap::new();
    for (category, amount) in amounts {
        let entry = totals.entry(category).or_insert((Money::zero(), 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    let by_category: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();

    ExpenseSummary {
        period,
        total: by_category.iter().map(|c| c.total).sum(),
        by_category,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fact(ts: &str, cents: i64) -> SaleFact {
        SaleFact {
            created_at: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            total: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_daily_buckets_split_by_sign() {
        let clock = BusinessClock::utc();
        let facts = [
            fact("2025-10-01T09:00:00Z", 4250),
            fact("2025-10-01T10:00:00Z", -850),
            fact("2025-10-03T10:00:00Z", 1000),
        ];
        let (from, to) = (date(2025, 10, 1), date(2025, 10, 3));
        let buckets = bucket_sales(&facts, &clock, Granularity::Day, from, to);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].gross, Money::from_cents(4250));
        assert_eq!(buckets[0].refunds, Money::from_cents(850));
        assert_eq!(buckets[0].net, Money::from_cents(3400));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 0);
        assert_eq!(buckets[2].net, Money::from_cents(1000));
    }

    #[test]
    fn test_buckets_follow_business_day() {
        let clock = BusinessClock::from_offset_str("+05:00").unwrap();
        let facts = [fact("2025-10-01T21:30:00Z", 500)];
        let (from, to) = (date(2025, 10, 1), date(2025, 10, 2));
        let buckets = bucket_sales(&facts, &clock, Granularity::Day, from, to);
        assert_eq!(buckets[0].count, 0);
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn test_week_and_month_buckets() {
        let clock = BusinessClock::utc();
        let facts = [fact("2025-10-01T09:00:00Z", 100), fact("2025-10-06T09:00:00Z", 200)];

        let (from, to) = (date(2025, 10, 1), date(2025, 10, 7));
        let weeks = bucket_sales(&facts, &clock, Granularity::Week, from, to);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].start, date(2025, 9, 29));
        assert_eq!(weeks[1].start, date(2025, 10, 6));

        let (from, to) = (date(2025, 1, 1), date(2025, 12, 31));
        let months = bucket_sales(&facts, &clock, Granularity::Month, from, to);
        assert_eq!(months.len(), 12);
        assert_eq!(months[9].gross, Money::from_cents(300));
    }

    #[test]
    fn test_summary_periods() {
        let today = date(2025, 10, 15);
        assert_eq!(SummaryPeriod::Daily.range(today), (today, today, Granularity::Day));
        assert_eq!(
            SummaryPeriod::Monthly.range(today),
            (date(2025, 10, 1), date(2025, 10, 31), Granularity::Day)
        );
        assert_eq!(
            SummaryPeriod::Yearly.range(today),
            (date(2025, 1, 1), date(2025, 12, 31), Granularity::Month)
        );
        assert!("weekly".parse::<SummaryPeriod>().is_err());
        assert_eq!("Monthly".parse::<SummaryPeriod>().unwrap(), SummaryPeriod::Monthly);
    }

    #[test]
    fn test_net_profit() {
        let bucket = SalesBucket {
            start: date(2025, 10, 1),
            gross: Money::from_cents(100_000),
            refunds: Money::from_cents(5_000),
            net: Money::from_cents(95_000),
            count: 12,
        };
        let summary = FinancialSummary::build(
            SummaryPeriod::Daily,
            bucket.start,
            bucket.start,
            vec![bucket.clone()],
            Money::from_cents(20_000),
            Money::from_cents(80_000),
        );
        assert_eq!(summary.total_sales, Money::from_cents(95_000));
        assert_eq!(summary.net_profit, Money::from_cents(-5_000));
        assert_eq!(summary.sales_count, 12);
    }

    #[test]
    fn test_expense_summary() {
        let period: Period = "2025-10".parse().unwrap();
        let summary = summarize_expenses(
            period,
            vec![
                (ExpenseCategory::Rent, Money::from_cents(50_000)),
                (ExpenseCategory::Utilities, Money::from_cents(7_500)),
                (ExpenseCategory::Utilities, Money::from_cents(2_500)),
            ],
        );
        assert_eq!(summary.total, Money::from_cents(60_000));
        assert_eq!(summary.by_category.len(), 2);
        assert_eq!(summary.by_category[1].category, ExpenseCategory::Utilities);
        assert_eq!(summary.by_category[1].total, Money::from_cents(10_000));
        assert_eq!(summary.by_category[1].count, 2);
    }
}
