//! # Batch Repository
//!
//! Supplier lots. Each restock creates a batch with its own expiry and cost.
//! Batch numbers come from the atomic `batchNumber` counter, so concurrent
//! restocks can never be issued the same number.

use chrono::{NaiveDate, Utc};
use rxdesk_core::sequence::{format_batch_number, BATCH_NUMBER_SCOPE};
use rxdesk_core::{Batch, Money};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::sequence::next_with;

const SELECT_BATCH: &str = r#"
    SELECT id, product_id, batch_number, supplier, expiry_date, quantity, cost_price, created_at
    FROM batches
"#;

/// Validated input for a new batch.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub product_id: String,
    pub supplier: Option<String>,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    pub cost_price: Money,
}

/// Admin edit of a batch; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    pub supplier: Option<Option<String>>,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub cost_price: Option<Money>,
}

#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Batches of a product, earliest expiry first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "{} WHERE product_id = ?1 ORDER BY expiry_date, batch_number",
            SELECT_BATCH
        );
        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(batches)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let sql = format!("{} WHERE id = ?1", SELECT_BATCH);
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    /// Creates a batch with the next `B000000` number.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - the product does not exist
    pub async fn create(&self, input: NewBatch) -> DbResult<Batch> {
        debug!(product_id = %input.product_id, quantity = input.quantity, "Creating batch");

        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(&input.product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Product", &input.product_id));
        }

        let seq = next_with(&mut *tx, BATCH_NUMBER_SCOPE).await?;
        let batch = Batch {
            id: new_id(),
            product_id: input.product_id,
            batch_number: format_batch_number(seq),
            supplier: input.supplier,
            expiry_date: input.expiry_date,
            quantity: input.quantity,
            cost_price: input.cost_price,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, product_id, batch_number, supplier,
                expiry_date, quantity, cost_price, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.product_id)
        .bind(&batch.batch_number)
        .bind(&batch.supplier)
        .bind(batch.expiry_date)
        .bind(batch.quantity)
        .bind(batch.cost_price)
        .bind(batch.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %batch.id, batch_number = %batch.batch_number, "Batch created");
        Ok(batch)
    }

    /// Admin edit (restock count, expiry correction, supplier, cost).
    pub async fn update(&self, id: &str, changes: UpdateBatch) -> DbResult<Batch> {
        let mut batch = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Batch", id))?;

        if let Some(supplier) = changes.supplier {
            batch.supplier = supplier;
        }
        if let Some(expiry) = changes.expiry_date {
            batch.expiry_date = expiry;
        }
        if let Some(quantity) = changes.quantity {
            batch.quantity = quantity;
        }
        if let Some(cost) = changes.cost_price {
            batch.cost_price = cost;
        }

        let result = sqlx::query(
            r#"
            UPDATE batches SET supplier = ?2, expiry_date = ?3, quantity = ?4, cost_price = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&batch.supplier)
        .bind(batch.expiry_date)
        .bind(batch.quantity)
        .bind(batch.cost_price)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        debug!(id = %id, quantity = batch.quantity, "Batch updated");
        Ok(batch)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM batches WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        info!(id = %id, "Batch deleted");
        Ok(())
    }
}
