//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Listing with stock summed across batches
//! - CRUD; delete cascades to batches
//! - Sequential product numbers from the `productId` counter
//!
//! ## Stock Is Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products has no stock column. Stock is always                         │
//! │                                                                         │
//! │     total_quantity = Σ batches.quantity  (expired included)            │
//! │                                                                         │
//! │  so a checkout only ever writes batches, never products.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use rxdesk_core::sequence::PRODUCT_ID_SCOPE;
use rxdesk_core::{Money, Product, ProductStock};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::sequence::next_with;

const SELECT_WITH_STOCK: &str = r#"
    SELECT
        p.id,
        p.sequential_id,
        p.name,
        p.category,
        p.price,
        p.description,
        p.created_at,
        p.updated_at,
        COALESCE(
            (SELECT SUM(b.quantity) FROM batches b WHERE b.product_id = p.id), 0
        ) AS total_quantity
    FROM products p
"#;

/// Validated input for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Money,
    pub description: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let listing = repo.list_with_stock(Some("para")).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products with their summed stock.
    ///
    /// `search` matches name or category (case-insensitive substring).
    pub async fn list_with_stock(&self, search: Option<&str>) -> DbResult<Vec<ProductStock>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        debug!(search = ?search, "Listing products");

        let sql = format!(
            "{} WHERE ?1 IS NULL \
             OR p.name LIKE '%' || ?1 || '%' \
             OR p.category LIKE '%' || ?1 || '%' \
             ORDER BY p.name",
            SELECT_WITH_STOCK
        );
        let products = sqlx::query_as::<_, ProductStock>(&sql)
            .bind(search)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Products labelled with category `name`, with stock.
    pub async fn list_by_category(&self, name: &str) -> DbResult<Vec<ProductStock>> {
        let sql = format!("{} WHERE p.category = ?1 ORDER BY p.name", SELECT_WITH_STOCK);
        let products = sqlx::query_as::<_, ProductStock>(&sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Gets a product with its stock.
    pub async fn get_with_stock(&self, id: &str) -> DbResult<Option<ProductStock>> {
        let sql = format!("{} WHERE p.id = ?1", SELECT_WITH_STOCK);
        let product = sqlx::query_as::<_, ProductStock>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sequential_id, name, category, price, description, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product with the next `productId` number.
    ///
    /// The counter increment and the insert share one transaction.
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        debug!(name = %input.name, "Inserting product");

        let mut tx = self.pool.begin().await?;
        let sequential_id = next_with(&mut *tx, PRODUCT_ID_SCOPE).await?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            sequential_id,
            name: input.name,
            category: input.category,
            price: input.price,
            description: input.description,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sequential_id, name, category, price, description, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(product.sequential_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.description)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %product.id, sequential_id, "Product created");
        Ok(product)
    }

    /// Updates an existing product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, changes: UpdateProduct) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(category) = changes.category {
            product.category = category;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        product.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                price = ?4,
                description = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.description)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Deletes a product and every batch it owns.
    ///
    /// Historical sale lines keep their snapshot of name and price.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        let batches = sqlx::query("DELETE FROM batches WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;

        info!(id = %id, batches_removed = batches.rows_affected(), "Product deleted");
        Ok(())
    }

    /// Counts products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::batch::NewBatch;
    use crate::repository::test_support::memory_db;
    use chrono::NaiveDate;

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.into(),
            category: "Analgesic".into(),
            price: Money::from_cents(425),
            description: Some("tablets".into()),
        }
    }

    fn new_batch(product_id: &str, qty: i64) -> NewBatch {
        NewBatch {
            product_id: product_id.into(),
            supplier: Some("MedSupply".into()),
            expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            quantity: qty,
            cost_price: Money::from_cents(200),
        }
    }

    #[tokio::test]
    async fn test_sequential_ids_increase() {
        let db = memory_db().await;
        let a = db.products().create(new_product("Paracetamol")).await.unwrap();
        let b = db.products().create(new_product("Ibuprofen")).await.unwrap();
        assert_eq!(a.sequential_id, 1);
        assert_eq!(b.sequential_id, 2);
        assert_eq!(db.products().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_sums_batch_quantities() {
        let db = memory_db().await;
        let p = db.products().create(new_product("Paracetamol")).await.unwrap();
        db.products().create(new_product("Aspirin")).await.unwrap();
        db.batches().create(new_batch(&p.id, 5)).await.unwrap();
        db.batches().create(new_batch(&p.id, 7)).await.unwrap();

        let listing = db.products().list_with_stock(None).await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].product.name, "Aspirin");
        assert_eq!(listing[0].total_quantity, 0);
        assert_eq!(listing[1].total_quantity, 12);

        let found = db.products().list_with_stock(Some("para")).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_update_partial() {
        let db = memory_db().await;
        let p = db.products().create(new_product("Paracetamol")).await.unwrap();

        let updated = db
            .products()
            .update(
                &p.id,
                UpdateProduct {
                    price: Some(Money::from_cents(500)),
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_cents(500));
        assert_eq!(updated.name, "Paracetamol");
        assert_eq!(updated.description, None);

        let err = db.products().update("missing", UpdateProduct::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_batches() {
        let db = memory_db().await;
        let p = db.products().create(new_product("Paracetamol")).await.unwrap();
        db.batches().create(new_batch(&p.id, 5)).await.unwrap();
        db.batches().create(new_batch(&p.id, 5)).await.unwrap();

        db.products().delete(&p.id).await.unwrap();

        assert!(db.products().get_by_id(&p.id).await.unwrap().is_none());
        assert!(db.batches().list_for_product(&p.id).await.unwrap().is_empty());
        assert!(matches!(db.products().delete(&p.id).await, Err(DbError::NotFound { .. })));
    }
}
