//! # Checkout Service
//!
//! The one multi-step write in rxdesk: turn a cart into a persisted sale
//! without ever overselling a batch or reusing an invoice number.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout lock (process-wide, async)                                   │
//! │  └── BEGIN                                                             │
//! │       1. load each product + all its batches          (tx)            │
//! │       2. plan: FEFO slices, prices, change            (rxdesk-core)   │
//! │       3. invoice-YYYYMMDD counter += 1                 (tx, late)      │
//! │       4. INSERT sale + sale_items                      (tx)            │
//! │       5. UPDATE batches SET quantity = quantity - n                    │
//! │          WHERE id = ? AND quantity >= n               (tx, each slice) │
//! │          0 rows → InsufficientStock → ROLLBACK                         │
//! │     COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock serializes checkouts inside this process; the conditional
//! decrement keeps stock non-negative even against writers that bypass it
//! (admin batch edits). Any failure rolls back every step, including the
//! invoice counter.

use std::sync::Arc;

use chrono::Utc;
use rxdesk_core::checkout::{
    merge_cart_lines, plan_checkout, plan_refund, CartLine, PaymentRequest, RefundLine, StockLot,
    StockedProduct,
};
use rxdesk_core::sequence::{format_invoice_number, invoice_scope};
use rxdesk_core::{
    BusinessClock, CoreError, Money, PaymentDetails, Principal, Product, Sale, SaleItem,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::sale::{fetch_sale, insert_sale, refunded_quantities};
use crate::repository::sequence::next_with;

/// What the cashier's screen needs after a successful checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub sale_id: String,
    pub invoice_number: String,
    pub total: Money,
    pub change: Money,
    pub created_at: chrono::DateTime<Utc>,
    pub items: Vec<SaleItem>,
}

impl From<Sale> for CheckoutReceipt {
    fn from(sale: Sale) -> Self {
        CheckoutReceipt {
            sale_id: sale.id,
            invoice_number: sale.invoice_number,
            total: sale.total,
            change: sale.payment.change.unwrap_or_default(),
            created_at: sale.created_at,
            items: sale.items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    lock: Arc<Mutex<()>>,
    clock: BusinessClock,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, lock: Arc<Mutex<()>>, clock: BusinessClock) -> Self {
        CheckoutService { pool, lock, clock }
    }

    /// Converts a cart into a persisted sale.
    ///
    /// ## Errors
    /// * `CoreError::ProductNotFound` - a line names an unknown product
    /// * `CoreError::InsufficientStock` - not enough units across batches
    /// * `CoreError::InvalidPayment` - cash missing or short
    /// * `DbError::PersistenceConflict` - invoice number already used
    pub async fn checkout(
        &self,
        cashier: &Principal,
        lines: &[CartLine],
        payment: &PaymentRequest,
        notes: Option<String>,
    ) -> DbResult<Sale> {
        let lines = merge_cart_lines(lines)?;
        debug!(cashier = %cashier.user_id, lines = lines.len(), "Checkout requested");

        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut products = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = load_stocked_product(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            products.push(product);
        }

        let plan = plan_checkout(&lines, &products, payment)?;

        let now = Utc::now();
        let invoice_number = allocate_invoice_number(&mut tx, &self.clock, now).await?;

        let sale = Sale {
            id: new_id(),
            invoice_number,
            items: plan.items,
            sub_total: plan.sub_total,
            total: plan.total,
            payment: plan.payment,
            cashier_id: cashier.user_id.clone(),
            notes,
            refund_of: None,
            created_at: now,
        };

        insert_sale(&mut tx, &sale).await.map_err(invoice_conflict)?;

        for item in &sale.items {
            let result = sqlx::query(
                "UPDATE batches SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
            )
            .bind(item.quantity)
            .bind(&item.batch_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available = available_stock(&mut tx, &item.product_id).await?;
                warn!(
                    batch_id = %item.batch_id,
                    requested = item.quantity,
                    "Conditional decrement failed, rolling back checkout"
                );
                return Err(CoreError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    product_name: item.product_name.clone(),
                    available,
                    requested: item.quantity,
                }
                .into());
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            total = sale.total.cents(),
            "Checkout completed"
        );
        Ok(sale)
    }

    /// Refunds a sale fully (`lines = None`) or by batch slices.
    ///
    /// The refund is its own sale record with negative quantities and
    /// totals, a fresh invoice number and `refund_of` set. Refunded units go
    /// back to their batches; slices whose batch was deleted are not
    /// restocked.
    ///
    /// Cashiers can only refund their own sales; anyone else's looks absent.
    pub async fn refund(
        &self,
        principal: &Principal,
        sale_id: &str,
        lines: Option<&[RefundLine]>,
        notes: Option<String>,
    ) -> DbResult<Sale> {
        debug!(sale_id = %sale_id, by = %principal.user_id, "Refund requested");

        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let original = fetch_sale(&mut tx, sale_id)
            .await?
            .filter(|s| principal.can_view_all_sales() || s.cashier_id == principal.user_id)
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let already = refunded_quantities(&mut tx, sale_id).await?;
        let items = plan_refund(&original, &already, lines)?;
        let total: Money = items.iter().map(|i| i.line_total).sum();

        let now = Utc::now();
        let invoice_number = allocate_invoice_number(&mut tx, &self.clock, now).await?;

        let refund = Sale {
            id: new_id(),
            invoice_number,
            items,
            sub_total: total,
            total,
            payment: PaymentDetails {
                payment_type: original.payment.payment_type,
                cash_received: None,
                change: None,
            },
            cashier_id: principal.user_id.clone(),
            notes,
            refund_of: Some(original.id.clone()),
            created_at: now,
        };

        insert_sale(&mut tx, &refund).await.map_err(invoice_conflict)?;

        for item in &refund.items {
            let result = sqlx::query("UPDATE batches SET quantity = quantity + ?1 WHERE id = ?2")
                .bind(-item.quantity)
                .bind(&item.batch_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                warn!(batch_id = %item.batch_id, "Refunded batch no longer exists, not restocked");
            }
        }

        tx.commit().await?;

        info!(
            refund_id = %refund.id,
            refund_of = %original.id,
            total = refund.total.cents(),
            "Refund recorded"
        );
        Ok(refund)
    }
}

async fn load_stocked_product(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Option<StockedProduct>> {
    let product: Option<Product> = sqlx::query_as(
        r#"
        SELECT id, sequential_id, name, category, price, description, created_at, updated_at
        FROM products WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(product) = product else {
        return Ok(None);
    };

    let lots: Vec<(String, String, chrono::NaiveDate, i64)> = sqlx::query_as(
        "SELECT id, batch_number, expiry_date, quantity FROM batches WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(StockedProduct {
        product_id: product.id,
        name: product.name,
        price: product.price,
        lots: lots
            .into_iter()
            .map(|(id, number, expiry, qty)| StockLot::new(id, number, expiry, qty))
            .collect(),
    }))
}

async fn available_stock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let available: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM batches WHERE product_id = ?1")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(available)
}

async fn allocate_invoice_number(
    conn: &mut SqliteConnection,
    clock: &BusinessClock,
    now: chrono::DateTime<Utc>,
) -> DbResult<String> {
    let scope = invoice_scope(clock, now);
    let seq = next_with(&mut *conn, &scope).await?;
    Ok(format_invoice_number(&scope, seq))
}

fn invoice_conflict(err: DbError) -> DbError {
    match err {
        DbError::UniqueViolation { ref field, .. } if field.contains("invoice_number") => {
            DbError::PersistenceConflict("invoice number already issued".to_string())
        }
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::batch::NewBatch;
    use crate::repository::product::NewProduct;
    use crate::repository::sale::SaleFilter;
    use crate::repository::test_support::memory_db;
    use crate::Database;
    use chrono::NaiveDate;
    use rxdesk_core::sequence::parse_invoice_number;
    use rxdesk_core::Role;

    fn cashier() -> Principal {
        Principal::new("cashier-1", "Sana", Role::Cashier)
    }

    async fn product_with_batches(
        db: &Database,
        price: i64,
        batches: &[(NaiveDate, i64)],
    ) -> (String, Vec<String>) {
        let product = db
            .products()
            .create(NewProduct {
                name: "Paracetamol 500mg".into(),
                category: "Analgesic".into(),
                price: Money::from_cents(price),
                description: None,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (expiry, qty) in batches {
            let batch = db
                .batches()
                .create(NewBatch {
                    product_id: product.id.clone(),
                    supplier: None,
                    expiry_date: *expiry,
                    quantity: *qty,
                    cost_price: Money::from_cents(100),
                })
                .await
                .unwrap();
            ids.push(batch.id);
        }
        (product.id, ids)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn quantity(db: &Database, batch_id: &str) -> i64 {
        db.batches().get_by_id(batch_id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_fefo_checkout_drains_earliest_batch() {
        let db = memory_db().await;
        let (pid, batches) =
            product_with_batches(&db, 425, &[(date(2025, 6, 1), 5), (date(2025, 1, 1), 5)]).await;
        let (late, early) = (&batches[0], &batches[1]);

        let sale = db
            .checkout()
            .checkout(&cashier(), &[CartLine::new(&pid, 7)], &PaymentRequest::card(), None)
            .await
            .unwrap();

        assert_eq!(sale.items.len(), 2);
        assert_eq!(&sale.items[0].batch_id, early);
        assert_eq!(sale.items[0].quantity, 5);
        assert_eq!(&sale.items[1].batch_id, late);
        assert_eq!(sale.items[1].quantity, 2);
        assert_eq!(quantity(&db, early).await, 0);
        assert_eq!(quantity(&db, late).await, 3);

        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items, sale.items);
        assert_eq!(stored.total, Money::from_cents(2975));
    }

    #[tokio::test]
    async fn test_cash_change_and_short_cash() {
        let db = memory_db().await;
        let (pid, batches) = product_with_batches(&db, 425, &[(date(2026, 1, 1), 20)]).await;

        let sale = db
            .checkout()
            .checkout(
                &cashier(),
                &[CartLine::new(&pid, 10)],
                &PaymentRequest::cash(Money::from_cents(5000)),
                None,
            )
            .await
            .unwrap();
        assert_eq!(sale.total, Money::from_cents(4250));
        assert_eq!(sale.payment.change, Some(Money::from_cents(750)));

        let err = db
            .checkout()
            .checkout(
                &cashier(),
                &[CartLine::new(&pid, 10)],
                &PaymentRequest::cash(Money::from_cents(4000)),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidPayment { .. })));
        assert_eq!(quantity(&db, &batches[0]).await, 10, "failed checkout leaves stock alone");
    }

    #[tokio::test]
    async fn test_insufficient_stock_persists_nothing() {
        let db = memory_db().await;
        let (pid, batches) = product_with_batches(&db, 100, &[(date(2026, 1, 1), 3)]).await;
        let (other, other_batches) =
            product_with_batches(&db, 100, &[(date(2026, 1, 1), 10)]).await;

        let err = db
            .checkout()
            .checkout(
                &cashier(),
                &[CartLine::new(&other, 2), CartLine::new(&pid, 4)],
                &PaymentRequest::card(),
                None,
            )
            .await
            .unwrap_err();

        match err {
            DbError::Core(e @ CoreError::InsufficientStock { .. }) => {
                assert_eq!(e.shortfall(), Some(1))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(quantity(&db, &batches[0]).await, 3);
        assert_eq!(quantity(&db, &other_batches[0]).await, 10);
        assert!(db.sales().list(&SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = memory_db().await;
        let err = db
            .checkout()
            .checkout(&cashier(), &[CartLine::new("ghost", 1)], &PaymentRequest::card(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_of_last_unit() {
        let db = memory_db().await;
        let (pid, batches) = product_with_batches(&db, 100, &[(date(2026, 1, 1), 1)]).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = db.checkout();
            let pid = pid.clone();
            handles.push(tokio::spawn(async move {
                service
                    .checkout(&cashier(), &[CartLine::new(pid, 1)], &PaymentRequest::card(), None)
                    .await
            }));
        }

        let mut ok = 0;
        let mut short = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::Core(CoreError::InsufficientStock { .. })) => short += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!((ok, short), (1, 1));
        assert_eq!(quantity(&db, &batches[0]).await, 0);
    }

    #[tokio::test]
    async fn test_invoice_numbers_strictly_increase() {
        let db = memory_db().await;
        let (pid, _) = product_with_batches(&db, 100, &[(date(2026, 1, 1), 500)]).await;

        let mut handles = Vec::new();
        for _ in 0..12 {
            let service = db.checkout();
            let pid = pid.clone();
            handles.push(tokio::spawn(async move {
                service
                    .checkout(&cashier(), &[CartLine::new(pid, 1)], &PaymentRequest::card(), None)
                    .await
                    .unwrap()
            }));
        }

        let mut sales = Vec::new();
        for h in handles {
            sales.push(h.await.unwrap());
        }
        sales.sort_by_key(|s| s.created_at);

        let mut numbers: Vec<i64> = sales
            .iter()
            .map(|s| parse_invoice_number(&s.invoice_number).unwrap().1)
            .collect();
        let in_commit_order = numbers.clone();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), 12, "no duplicates");
        assert_eq!(in_commit_order, numbers, "issued in order");
    }

    #[tokio::test]
    async fn test_failed_checkout_does_not_consume_invoice_number() {
        let db = memory_db().await;
        let (pid, _) = product_with_batches(&db, 100, &[(date(2026, 1, 1), 1)]).await;

        let ok = db
            .checkout()
            .checkout(&cashier(), &[CartLine::new(&pid, 1)], &PaymentRequest::card(), None)
            .await
            .unwrap();
        assert!(db
            .checkout()
            .checkout(&cashier(), &[CartLine::new(&pid, 1)], &PaymentRequest::card(), None)
            .await
            .is_err());

        let scope = format!("invoice-{}", ok.invoice_number.split('-').next().unwrap());
        assert_eq!(db.sequences().current(&scope).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refund_restocks_and_limits() {
        let db = memory_db().await;
        let (pid, batches) =
            product_with_batches(&db, 425, &[(date(2025, 1, 1), 5), (date(2025, 6, 1), 5)]).await;

        let sale = db
            .checkout()
            .checkout(&cashier(), &[CartLine::new(&pid, 7)], &PaymentRequest::card(), None)
            .await
            .unwrap();

        let partial = db
            .checkout()
            .refund(
                &cashier(),
                &sale.id,
                Some(&[RefundLine { batch_id: batches[1].clone(), quantity: 2 }]),
                Some("damaged box".into()),
            )
            .await
            .unwrap();
        assert!(partial.is_refund());
        assert_eq!(partial.total, Money::from_cents(-850));
        assert_eq!(partial.refund_of.as_deref(), Some(sale.id.as_str()));
        assert_eq!(quantity(&db, &batches[1]).await, 5);

        let err = db
            .checkout()
            .refund(
                &cashier(),
                &sale.id,
                Some(&[RefundLine { batch_id: batches[1].clone(), quantity: 1 }]),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::RefundExceedsSale { refundable: 0, .. })));

        let rest = db.checkout().refund(&cashier(), &sale.id, None, None).await.unwrap();
        assert_eq!(rest.total, Money::from_cents(-2125));
        assert_eq!(quantity(&db, &batches[0]).await, 5);
        assert_eq!(db.sales().list_refunds(&sale.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cashier_cannot_refund_someone_elses_sale() {
        let db = memory_db().await;
        let (pid, _) = product_with_batches(&db, 100, &[(date(2026, 1, 1), 5)]).await;
        let sale = db
            .checkout()
            .checkout(&cashier(), &[CartLine::new(&pid, 1)], &PaymentRequest::card(), None)
            .await
            .unwrap();

        let other = Principal::new("cashier-2", "Bilal", Role::Cashier);
        let err = db.checkout().refund(&other, &sale.id, None, None).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SaleNotFound(_))));

        let admin = Principal::new("admin-1", "Admin", Role::Admin);
        assert!(db.checkout().refund(&admin, &sale.id, None, None).await.is_ok());
    }
}
