//! # Expense Repository
//!
//! The expense ledger. Dates are business-calendar dates, so date filters
//! compare `YYYY-MM-DD` text directly.

use chrono::{NaiveDate, Utc};
use rxdesk_core::clock::Period;
use rxdesk_core::report::{summarize_expenses, ExpenseSummary};
use rxdesk_core::{Expense, ExpenseCategory, Money};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const SELECT_EXPENSE: &str = r#"
    SELECT id, category, amount, date, description, created_by, created_at
    FROM expenses
"#;

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateExpense {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub description: Option<Option<String>>,
}

/// Inclusive date range and category filter; all optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Newest first.
    pub async fn list(&self, filter: ExpenseFilter) -> DbResult<Vec<Expense>> {
        debug!(?filter, "Listing expenses");
        let sql = format!(
            "{} WHERE (?1 IS NULL OR date >= ?1) \
               AND (?2 IS NULL OR date <= ?2) \
               AND (?3 IS NULL OR category = ?3) \
             ORDER BY date DESC, created_at DESC",
            SELECT_EXPENSE
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.category)
            .fetch_all(&self.pool)
            .await?;
        Ok(expenses)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let sql = format!("{} WHERE id = ?1", SELECT_EXPENSE);
        let expense = sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    /// Records an expense on behalf of `created_by` (a user id).
    pub async fn create(&self, input: NewExpense, created_by: &str) -> DbResult<Expense> {
        let expense = Expense {
            id: new_id(),
            category: input.category,
            amount: input.amount,
            date: input.date,
            description: input.description,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (id, category, amount, date, description, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&expense.id)
        .bind(expense.category)
        .bind(expense.amount)
        .bind(expense.date)
        .bind(&expense.description)
        .bind(&expense.created_by)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            id = %expense.id,
            category = expense.category.as_str(),
            amount = expense.amount.cents(),
            "Expense recorded"
        );
        Ok(expense)
    }

    pub async fn update(&self, id: &str, changes: UpdateExpense) -> DbResult<Expense> {
        let mut expense = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))?;

        if let Some(category) = changes.category {
            expense.category = category;
        }
        if let Some(amount) = changes.amount {
            expense.amount = amount;
        }
        if let Some(date) = changes.date {
            expense.date = date;
        }
        if let Some(description) = changes.description {
            expense.description = description;
        }

        sqlx::query(
            "UPDATE expenses SET category = ?2, amount = ?3, date = ?4, description = ?5 \
             WHERE id = ?1",
        )
            .bind(id)
            .bind(expense.category)
            .bind(expense.amount)
            .bind(expense.date)
            .bind(&expense.description)
            .execute(&self.pool)
            .await?;

        debug!(id = %id, "Expense updated");
        Ok(expense)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        info!(id = %id, "Expense deleted");
        Ok(())
    }

    /// Total plus per-category totals for one month.
    pub async fn month_summary(&self, period: Period) -> DbResult<ExpenseSummary> {
        let rows: Vec<(ExpenseCategory, Money)> = sqlx::query_as(
            "SELECT category, amount FROM expenses WHERE date >= ?1 AND date <= ?2",
        )
        .bind(period.first_day())
        .bind(period.last_day())
        .fetch_all(&self.pool)
        .await?;

        Ok(summarize_expenses(period, rows))
    }

    /// Sum of amounts dated within `from..=to`.
    pub async fn total_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Money> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE date >= ?1 AND date <= ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(total))
    }
}
