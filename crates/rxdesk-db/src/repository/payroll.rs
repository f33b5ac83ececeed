//! # Payroll Repository
//!
//! Monthly payroll entries, one per (employee, period).
//!
//! ## Period Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET /payroll?period=2025-10                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_or_create_for_period                                             │
//! │    for each ACTIVE employee:                                           │
//! │      INSERT ... ON CONFLICT (employee_id, period) DO NOTHING           │
//! │      (base_salary snapshotted, advances = deductions = 0)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every entry of the period (inactive employees' old rows included)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calling it twice only fills gaps. Existing entries are never rewritten.

use chrono::{NaiveDate, Utc};
use rxdesk_core::clock::Period;
use rxdesk_core::payroll::{resolve_paid_state, PayrollAmendment};
use rxdesk_core::{Money, PayrollEntry, PayrollPaymentMethod};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const SELECT_ENTRY: &str = r#"
    SELECT
        p.id, p.employee_id, e.name AS employee_name, p.period, p.base_salary,
        p.advances, p.deductions, p.net_pay, p.paid, p.paid_date, p.payment_method,
        p.updated_at
    FROM payroll_entries p
    JOIN employees e ON e.id = p.employee_id
"#;

/// A mark-paid / mark-unpaid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkPaid {
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub payment_method: Option<PayrollPaymentMethod>,
}

/// One CSV export line: the entry plus the employee's job title.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PayrollExportRow {
    #[sqlx(flatten)]
    pub entry: PayrollEntry,
    pub employee_role: String,
}

#[derive(Debug, Clone)]
pub struct PayrollRepository {
    pool: SqlitePool,
}

impl PayrollRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PayrollRepository { pool }
    }

    /// Fills in missing entries for active employees, then lists the period.
    pub async fn list_or_create_for_period(&self, period: Period) -> DbResult<Vec<PayrollEntry>> {
        let period_key = period.to_string();
        let mut tx = self.pool.begin().await?;

        let missing: Vec<(String, Money)> = sqlx::query_as(
            r#"
            SELECT e.id, e.base_salary
            FROM employees e
            WHERE e.status = 'active'
              AND NOT EXISTS (
                  SELECT 1 FROM payroll_entries p
                  WHERE p.employee_id = e.id AND p.period = ?1
              )
            "#,
        )
        .bind(&period_key)
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        for (employee_id, base_salary) in &missing {
            sqlx::query(
                r#"
                INSERT INTO payroll_entries (
                    id, employee_id, period, base_salary, advances, deductions, net_pay,
                    paid, paid_date, payment_method, updated_at
                ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?4, 0, NULL, NULL, ?5)
                ON CONFLICT (employee_id, period) DO NOTHING
                "#,
            )
            .bind(new_id())
            .bind(employee_id)
            .bind(&period_key)
            .bind(*base_salary)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let entries = entries_for_period(&mut tx, &period_key).await?;
        tx.commit().await?;

        if !missing.is_empty() {
            info!(period = %period_key, created = missing.len(), "Payroll entries generated");
        }
        Ok(entries)
    }

    /// Entries of a period without generating anything.
    pub async fn list_for_period(&self, period: Period) -> DbResult<Vec<PayrollEntry>> {
        let mut conn = self.pool.acquire().await?;
        entries_for_period(&mut conn, &period.to_string()).await
    }

    /// Export lines for a period, ordered by employee name.
    pub async fn export_rows(&self, period: Period) -> DbResult<Vec<PayrollExportRow>> {
        let rows = sqlx::query_as::<_, PayrollExportRow>(
            r#"
            SELECT
                p.id, p.employee_id, e.name AS employee_name, p.period, p.base_salary,
                p.advances, p.deductions, p.net_pay, p.paid, p.paid_date, p.payment_method,
                p.updated_at, e.role AS employee_role
            FROM payroll_entries p
            JOIN employees e ON e.id = p.employee_id
            WHERE p.period = ?1
            ORDER BY e.name
            "#,
        )
        .bind(period.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PayrollEntry>> {
        let sql = format!("{} WHERE p.id = ?1", SELECT_ENTRY);
        let entry = sqlx::query_as::<_, PayrollEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    /// Amends amounts; net pay is recomputed before the write.
    pub async fn update_entry(
        &self,
        id: &str,
        amendment: &PayrollAmendment,
    ) -> DbResult<PayrollEntry> {
        let mut entry = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("PayrollEntry", id))?;

        amendment.apply(&mut entry)?;
        entry.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE payroll_entries
            SET base_salary = ?2, advances = ?3, deductions = ?4, net_pay = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(entry.base_salary)
        .bind(entry.advances)
        .bind(entry.deductions)
        .bind(entry.net_pay)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, net_pay = entry.net_pay.cents(), "Payroll entry amended");
        Ok(entry)
    }

    /// Marks an entry paid or unpaid. `today` fills a missing paid date.
    pub async fn mark_paid(
        &self,
        id: &str,
        request: MarkPaid,
        today: NaiveDate,
    ) -> DbResult<PayrollEntry> {
        let state = resolve_paid_state(
            request.paid,
            request.paid_date,
            request.payment_method,
            today,
        )?;

        let mut entry = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("PayrollEntry", id))?;
        entry.paid = state.paid;
        entry.paid_date = state.paid_date;
        entry.payment_method = state.payment_method;
        entry.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE payroll_entries
            SET paid = ?2, paid_date = ?3, payment_method = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(entry.paid)
        .bind(entry.paid_date)
        .bind(entry.payment_method)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %id, paid = entry.paid, "Payroll entry payment state changed");
        Ok(entry)
    }

    /// Net pay of entries paid within `from..=to`.
    pub async fn paid_total_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(net_pay), 0) FROM payroll_entries
            WHERE paid = 1 AND paid_date >= ?1 AND paid_date <= ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(total))
    }
}

async fn entries_for_period(
    conn: &mut SqliteConnection,
    period: &str,
) -> DbResult<Vec<PayrollEntry>> {
    let sql = format!("{} WHERE p.period = ?1 ORDER BY e.name", SELECT_ENTRY);
    let entries = sqlx::query_as::<_, PayrollEntry>(&sql)
        .bind(period)
        .fetch_all(&mut *conn)
        .await?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::employee::NewEmployee;
    use crate::repository::test_support::memory_db;
    use crate::Database;
    use rxdesk_core::{EmployeeStatus, ValidationError};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn staff(db: &Database) -> (String, String) {
        let hina = db
            .employees()
            .create(NewEmployee {
                name: "Hina".into(),
                role: "pharmacist".into(),
                base_salary: Money::from_cents(4_000_000),
                hire_date: date(2024, 1, 10),
            })
            .await
            .unwrap();
        let asad = db
            .employees()
            .create(NewEmployee {
                name: "Asad".into(),
                role: "cashier".into(),
                base_salary: Money::from_cents(3_000_000),
                hire_date: date(2024, 6, 1),
            })
            .await
            .unwrap();
        (hina.id, asad.id)
    }

    #[tokio::test]
    async fn test_period_generation_is_idempotent() {
        let db = memory_db().await;
        let (_, asad) = staff(&db).await;
        let period: Period = "2025-10".parse().unwrap();

        let first = db.payroll().list_or_create_for_period(period).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].employee_name, "Asad");
        assert_eq!(first[0].net_pay, Money::from_cents(3_000_000));

        let second = db.payroll().list_or_create_for_period(period).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(
            first.iter().map(|e| &e.id).collect::<Vec<_>>(),
            second.iter().map(|e| &e.id).collect::<Vec<_>>()
        );

        db.employees().set_status(&asad, EmployeeStatus::Inactive).await.unwrap();
        let next: Period = "2025-11".parse().unwrap();
        assert_eq!(db.payroll().list_or_create_for_period(next).await.unwrap().len(), 1);
        assert_eq!(db.payroll().list_for_period(period).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_amendment_recomputes_net_pay() {
        let db = memory_db().await;
        staff(&db).await;
        let period: Period = "2025-10".parse().unwrap();
        let entry = db.payroll().list_or_create_for_period(period).await.unwrap().remove(1);

        let amended = db
            .payroll()
            .update_entry(
                &entry.id,
                &PayrollAmendment {
                    advances: Some(Money::from_cents(125_050)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(amended.net_pay, Money::from_cents(3_874_950));

        let floored = db
            .payroll()
            .update_entry(
                &entry.id,
                &PayrollAmendment {
                    deductions: Some(Money::from_cents(9_000_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(floored.net_pay, Money::zero());

        let err = db
            .payroll()
            .update_entry(
                &entry.id,
                &PayrollAmendment {
                    advances: Some(Money::from_cents(-1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(_)));

        let stored = db.payroll().get_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.net_pay, Money::zero());
    }

    #[tokio::test]
    async fn test_mark_paid_rules() {
        let db = memory_db().await;
        staff(&db).await;
        let period: Period = "2025-10".parse().unwrap();
        let entry = db.payroll().list_or_create_for_period(period).await.unwrap().remove(0);
        let today = date(2025, 10, 31);

        let err = db
            .payroll()
            .mark_paid(
                &entry.id,
                MarkPaid { paid: true, paid_date: None, payment_method: None },
                today,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(rxdesk_core::CoreError::Validation(ValidationError::Required { .. }))
        ));

        let paid = db
            .payroll()
            .mark_paid(
                &entry.id,
                MarkPaid {
                    paid: true,
                    paid_date: None,
                    payment_method: Some(PayrollPaymentMethod::BankTransfer),
                },
                today,
            )
            .await
            .unwrap();
        assert_eq!(paid.paid_date, Some(today));
        assert_eq!(
            db.payroll().paid_total_between(date(2025, 10, 1), date(2025, 10, 31)).await.unwrap(),
            Money::from_cents(3_000_000)
        );

        let unpaid = db
            .payroll()
            .mark_paid(
                &entry.id,
                MarkPaid {
                    paid: false,
                    paid_date: Some(today),
                    payment_method: Some(PayrollPaymentMethod::Cash),
                },
                today,
            )
            .await
            .unwrap();
        assert_eq!((unpaid.paid_date, unpaid.payment_method), (None, None));
        assert_eq!(
            db.payroll().paid_total_between(date(2025, 10, 1), date(2025, 10, 31)).await.unwrap(),
            Money::zero()
        );
    }

    #[tokio::test]
    async fn test_export_rows_carry_role() {
        let db = memory_db().await;
        staff(&db).await;
        let period: Period = "2025-10".parse().unwrap();
        db.payroll().list_or_create_for_period(period).await.unwrap();

        let rows = db.payroll().export_rows(period).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].employee_role, "cashier");
        assert_eq!(rows[1].entry.employee_name, "Hina");
    }
}
