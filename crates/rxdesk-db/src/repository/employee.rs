//! # Employee Repository
//!
//! The staff roster that payroll periods are generated from. Job titles in
//! `role` are free text and have nothing to do with login roles.

use chrono::{NaiveDate, Utc};
use rxdesk_core::{Employee, EmployeeStatus, Money};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const SELECT_EMPLOYEE: &str = r#"
    SELECT id, name, role, base_salary, status, hire_date, created_at
    FROM employees
"#;

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub role: String,
    pub base_salary: Money,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub role: Option<String>,
    pub base_salary: Option<Money>,
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Lists employees by name, optionally only one status.
    pub async fn list(&self, status: Option<EmployeeStatus>) -> DbResult<Vec<Employee>> {
        let sql = format!("{} WHERE ?1 IS NULL OR status = ?1 ORDER BY name", SELECT_EMPLOYEE);
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let sql = format!("{} WHERE id = ?1", SELECT_EMPLOYEE);
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    /// New hires start active.
    pub async fn create(&self, input: NewEmployee) -> DbResult<Employee> {
        let employee = Employee {
            id: new_id(),
            name: input.name,
            role: input.role,
            base_salary: input.base_salary,
            status: EmployeeStatus::Active,
            hire_date: input.hire_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO employees (id, name, role, base_salary, status, hire_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(&employee.role)
        .bind(employee.base_salary)
        .bind(employee.status)
        .bind(employee.hire_date)
        .bind(employee.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %employee.id, name = %employee.name, "Employee created");
        Ok(employee)
    }

    /// Salary changes apply to periods generated afterwards; existing
    /// payroll entries keep their snapshot.
    pub async fn update(&self, id: &str, changes: UpdateEmployee) -> DbResult<Employee> {
        let mut employee = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))?;

        if let Some(name) = changes.name {
            employee.name = name;
        }
        if let Some(role) = changes.role {
            employee.role = role;
        }
        if let Some(salary) = changes.base_salary {
            employee.base_salary = salary;
        }
        if let Some(hire_date) = changes.hire_date {
            employee.hire_date = hire_date;
        }

        sqlx::query(
            "UPDATE employees SET name = ?2, role = ?3, base_salary = ?4, hire_date = ?5 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&employee.name)
        .bind(&employee.role)
        .bind(employee.base_salary)
        .bind(employee.hire_date)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Employee updated");
        Ok(employee)
    }

    pub async fn set_status(&self, id: &str, status: EmployeeStatus) -> DbResult<Employee> {
        let result = sqlx::query("UPDATE employees SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        info!(id = %id, status = ?status, "Employee status changed");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    /// Deletes an employee together with any unpaid payroll entries.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - the employee has paid payroll entries;
    ///   deactivate them instead
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM employees WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Employee", id));
        }

        let paid: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payroll_entries WHERE employee_id = ?1 AND paid = 1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if paid > 0 {
            return Err(DbError::InUse(format!(
                "Employee {} has {} paid payroll entr{}",
                id,
                paid,
                if paid == 1 { "y" } else { "ies" }
            )));
        }

        let unpaid = sqlx::query("DELETE FROM payroll_entries WHERE employee_id = ?1 AND paid = 0")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM employees WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, unpaid_entries = unpaid.rows_affected(), "Employee deleted");
        Ok(())
    }
}
