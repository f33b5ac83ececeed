//! # Sale Repository
//!
//! Reads of persisted sales, plus the row-level helpers the checkout
//! transaction uses to write them.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales                         sale_items (one row per batch slice)    │
//! │  ─────                         ──────────                              │
//! │  id ◄──────────────────────── sale_id, line_no                         │
//! │  invoice_number (UNIQUE)       product_id / product_name  (snapshot)   │
//! │  sub_total, total              batch_id / batch_number    (snapshot)   │
//! │  payment_type, cash_received,  quantity  (< 0 on refunds)              │
//! │  change_due                    unit_price, line_total                  │
//! │  cashier_id, refund_of                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rxdesk_core::{Money, PaymentDetails, PaymentType, Sale, SaleItem};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Listing filter. `cashier_id = None` means every cashier.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub cashier_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    invoice_number: String,
    sub_total: Money,
    total: Money,
    payment_type: PaymentType,
    cash_received: Option<Money>,
    change_due: Option<Money>,
    cashier_id: String,
    notes: Option<String>,
    refund_of: Option<String>,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            invoice_number: self.invoice_number,
            items,
            sub_total: self.sub_total,
            total: self.total,
            payment: PaymentDetails {
                payment_type: self.payment_type,
                cash_received: self.cash_received,
                change: self.change_due,
            },
            cashier_id: self.cashier_id,
            notes: self.notes,
            refund_of: self.refund_of,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    product_id: String,
    product_name: String,
    batch_id: String,
    batch_number: String,
    quantity: i64,
    unit_price: Money,
    line_total: Money,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            product_id: row.product_id,
            product_name: row.product_name,
            batch_id: row.batch_id,
            batch_number: row.batch_number,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

const SELECT_SALE: &str = r#"
    SELECT id, invoice_number, sub_total, total, payment_type, cash_received, change_due,
           cashier_id, notes, refund_of, created_at
    FROM sales
"#;

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM sales WHERE invoice_number = ?1")
                .bind(invoice_number)
                .fetch_optional(&mut *conn)
                .await?;
        match id {
            Some(id) => fetch_sale(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Sales newest first, with items.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        debug!(cashier = ?filter.cashier_id, "Listing sales");

        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "{} WHERE (?1 IS NULL OR cashier_id = ?1) \
               AND (?2 IS NULL OR created_at >= ?2) \
               AND (?3 IS NULL OR created_at < ?3) \
             ORDER BY created_at DESC, invoice_number DESC \
             LIMIT ?4 OFFSET ?5",
            SELECT_SALE
        );
        let rows: Vec<SaleRow> = sqlx::query_as(&sql)
            .bind(&filter.cashier_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit.unwrap_or(100).clamp(1, 1000))
            .bind(filter.offset.unwrap_or(0).max(0))
            .fetch_all(&mut *conn)
            .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = fetch_items(&mut conn, &row.id).await?;
            sales.push(row.into_sale(items));
        }
        Ok(sales)
    }

    /// Refund records issued against `sale_id`.
    pub async fn list_refunds(&self, sale_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{} WHERE refund_of = ?1 ORDER BY created_at", SELECT_SALE);
        let rows: Vec<SaleRow> = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = fetch_items(&mut conn, &row.id).await?;
            sales.push(row.into_sale(items));
        }
        Ok(sales)
    }
}

// =============================================================================
// Connection-level helpers (shared with the checkout transaction)
// =============================================================================

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("{} WHERE id = ?1", SELECT_SALE);
    let row: Option<SaleRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;

    match row {
        Some(row) => {
            let items = fetch_items(conn, &row.id).await?;
            Ok(Some(row.into_sale(items)))
        }
        None => Ok(None),
    }
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let rows: Vec<SaleItemRow> = sqlx::query_as(
        r#"
        SELECT product_id, product_name, batch_id, batch_number, quantity, unit_price, line_total
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY line_no
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(SaleItem::from).collect())
}

/// Units already refunded per batch for `sale_id`.
pub(crate) async fn refunded_quantities(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT i.batch_id, -SUM(i.quantity)
        FROM sale_items i
        JOIN sales s ON s.id = i.sale_id
        WHERE s.refund_of = ?1
        GROUP BY i.batch_id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Inserts a sale row and its item rows.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, invoice_number, sub_total, total, payment_type, cash_received, change_due,
            cashier_id, notes, refund_of, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.invoice_number)
    .bind(sale.sub_total)
    .bind(sale.total)
    .bind(sale.payment.payment_type)
    .bind(sale.payment.cash_received)
    .bind(sale.payment.change)
    .bind(&sale.cashier_id)
    .bind(&sale.notes)
    .bind(&sale.refund_of)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, line_no, product_id, product_name, batch_id, batch_number,
                quantity, unit_price, line_total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(&item.batch_id)
        .bind(&item.batch_number)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
