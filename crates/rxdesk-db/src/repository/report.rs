//! # Report Repository
//!
//! Read-side aggregations for dashboards. Queries only fetch the rows a
//! window needs; classification and bucketing are done by `rxdesk-core`
//! against the business clock so day boundaries match invoice numbering.

use chrono::{DateTime, NaiveDate, Utc};
use rxdesk_core::alerts::{build_alerts, AlertThresholds, Alerts};
use rxdesk_core::report::{
    bucket_sales, FinancialSummary, Granularity, SaleFact, SalesBucket, SummaryPeriod,
};
use rxdesk_core::{Batch, BusinessClock};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::expense::ExpenseRepository;
use crate::repository::payroll::PayrollRepository;
use crate::repository::product::ProductRepository;

#[derive(Debug, sqlx::FromRow)]
struct BatchWithProduct {
    #[sqlx(flatten)]
    batch: Batch,
    product_name: String,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    clock: BusinessClock,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool, clock: BusinessClock) -> Self {
        ReportRepository { pool, clock }
    }

    /// Expired, expiring-soon and low-stock lists as of `now`.
    pub async fn alerts(
        &self,
        thresholds: AlertThresholds,
        now: DateTime<Utc>,
    ) -> DbResult<Alerts> {
        let rows = sqlx::query_as::<_, BatchWithProduct>(
            r#"
            SELECT b.id, b.product_id, b.batch_number, b.supplier, b.expiry_date, b.quantity,
                   b.cost_price, b.created_at, p.name AS product_name
            FROM batches b
            JOIN products p ON p.id = b.product_id
            ORDER BY b.expiry_date, b.batch_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let products = ProductRepository::new(self.pool.clone()).list_with_stock(None).await?;
        let today = self.clock.today(now);

        debug!(batches = rows.len(), products = products.len(), %today, "Computing alerts");
        Ok(build_alerts(
            rows.into_iter().map(|r| (r.batch, r.product_name)).collect(),
            &products,
            today,
            thresholds,
        ))
    }

    /// Sales bucketed over the business dates `from..=to`.
    pub async fn sales_buckets(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        granularity: Granularity,
    ) -> DbResult<Vec<SalesBucket>> {
        let window = self.clock.date_range_window(from, to);
        let facts = sqlx::query_as::<_, SaleFact>(
            "SELECT created_at, total FROM sales WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        debug!(%from, %to, sales = facts.len(), "Bucketing sales");
        Ok(bucket_sales(&facts, &self.clock, granularity, from, to))
    }

    /// Profit and loss for the day, month or year containing `now`.
    pub async fn summary(
        &self,
        period: SummaryPeriod,
        now: DateTime<Utc>,
    ) -> DbResult<FinancialSummary> {
        let (from, to, granularity) = period.range(self.clock.today(now));

        let buckets = self.sales_buckets(from, to, granularity).await?;
        let expenses = ExpenseRepository::new(self.pool.clone()).total_between(from, to).await?;
        let payroll = PayrollRepository::new(self.pool.clone()).paid_total_between(from, to).await?;

        Ok(FinancialSummary::build(period, from, to, buckets, expenses, payroll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::batch::NewBatch;
    use crate::repository::employee::NewEmployee;
    use crate::repository::expense::NewExpense;
    use crate::repository::payroll::MarkPaid;
    use crate::repository::product::NewProduct;
    use crate::repository::test_support::memory_db;
    use chrono::Duration;
    use rxdesk_core::checkout::{CartLine, PaymentRequest};
    use rxdesk_core::clock::Period;
    use rxdesk_core::{ExpenseCategory, Money, PayrollPaymentMethod, Principal, Role};

    #[tokio::test]
    async fn test_alerts_against_today() {
        let db = memory_db().await;
        let now = Utc::now();
        let today = db.clock().today(now);

        let p = db
            .products()
            .create(NewProduct {
                name: "Cough Syrup".into(),
                category: "Respiratory".into(),
                price: Money::from_cents(300),
                description: None,
            })
            .await
            .unwrap();
        for (offset, qty) in [(-3, 2), (10, 3), (200, 4)] {
            db.batches()
                .create(NewBatch {
                    product_id: p.id.clone(),
                    supplier: None,
                    expiry_date: today + Duration::days(offset),
                    quantity: qty,
                    cost_price: Money::from_cents(100),
                })
                .await
                .unwrap();
        }

        let alerts = db.reports().alerts(AlertThresholds::default(), now).await.unwrap();
        assert_eq!(alerts.expired_batches.len(), 1);
        assert_eq!(alerts.expired_batches[0].product_name, "Cough Syrup");
        assert_eq!(alerts.expiring_soon_batches.len(), 1);
        assert_eq!(alerts.expiring_soon_batches[0].days_until_expiry, 10);
        assert_eq!(alerts.low_stock_products.len(), 1, "9 units is at or below 10");
        assert_eq!(alerts.low_stock_products[0].total_quantity, 9);
    }

    #[tokio::test]
    async fn test_daily_summary_nets_refunds_expenses_and_payroll() {
        let db = memory_db().await;
        let now = Utc::now();
        let today = db.clock().today(now);

        let p = db
            .products()
            .create(NewProduct {
                name: "Bandage".into(),
                category: "First Aid".into(),
                price: Money::from_cents(1_000),
                description: None,
            })
            .await
            .unwrap();
        db.batches()
            .create(NewBatch {
                product_id: p.id.clone(),
                supplier: None,
                expiry_date: today + Duration::days(365),
                quantity: 50,
                cost_price: Money::from_cents(400),
            })
            .await
            .unwrap();

        let cashier = Principal::new("c1", "Sana", Role::Cashier);
        let sale = db
            .checkout()
            .checkout(&cashier, &[CartLine::new(&p.id, 5)], &PaymentRequest::card(), None)
            .await
            .unwrap();
        db.checkout()
            .checkout(&cashier, &[CartLine::new(&p.id, 2)], &PaymentRequest::card(), None)
            .await
            .unwrap();
        db.checkout().refund(&cashier, &sale.id, None, None).await.unwrap();

        db.expenses()
            .create(
                NewExpense {
                    category: ExpenseCategory::Supplies,
                    amount: Money::from_cents(1_500),
                    date: today,
                    description: None,
                },
                "admin",
            )
            .await
            .unwrap();

        let emp = db
            .employees()
            .create(NewEmployee {
                name: "Hina".into(),
                role: "pharmacist".into(),
                base_salary: Money::from_cents(2_000),
                hire_date: today,
            })
            .await
            .unwrap();
        let entries = db
            .payroll()
            .list_or_create_for_period(Period::containing(today))
            .await
            .unwrap();
        assert_eq!(entries[0].employee_id, emp.id);
        db.payroll()
            .mark_paid(
                &entries[0].id,
                MarkPaid {
                    paid: true,
                    paid_date: None,
                    payment_method: Some(PayrollPaymentMethod::Cash),
                },
                today,
            )
            .await
            .unwrap();

        let summary = db.reports().summary(SummaryPeriod::Daily, now).await.unwrap();
        assert_eq!(summary.gross_sales, Money::from_cents(7_000));
        assert_eq!(summary.refunds, Money::from_cents(5_000));
        assert_eq!(summary.total_sales, Money::from_cents(2_000));
        assert_eq!(summary.sales_count, 3);
        assert_eq!(summary.total_expenses, Money::from_cents(1_500));
        assert_eq!(summary.total_payroll_paid, Money::from_cents(2_000));
        assert_eq!(summary.net_profit, Money::from_cents(-1_500));
        assert_eq!(summary.buckets.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_month_has_a_bucket_per_day() {
        let db = memory_db().await;
        let buckets = db
            .reports()
            .sales_buckets(
                NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                Granularity::Day,
            )
            .await
            .unwrap();
        assert_eq!(buckets.len(), 28);
        assert!(buckets.iter().all(|b| b.count == 0));
    }
}
