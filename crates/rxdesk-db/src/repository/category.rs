//! # Category Repository
//!
//! ## Rename Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.category holds the category NAME (no foreign key)            │
//! │                                                                         │
//! │  rename "Analgesic" → "Pain Relief"                                    │
//! │     categories row updated            ✅                                │
//! │     products still say "Analgesic"    (unchanged)                      │
//! │                                                                         │
//! │  backfill(id, from = "Analgesic")                                      │
//! │     UPDATE products SET category = 'Pain Relief'                       │
//! │     WHERE category = 'Analgesic'      → n products moved              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use rxdesk_core::Category;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already taken
    pub async fn create(&self, name: &str, description: Option<&str>) -> DbResult<Category> {
        debug!(name = %name, "Creating category");

        let category = Category {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(name))?;

        Ok(category)
    }

    /// Renames and/or re-describes a category. Products are not touched.
    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> DbResult<Category> {
        let mut category = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;

        if let Some(name) = name {
            category.name = name.to_string();
        }
        if let Some(description) = description {
            category.description = description.map(str::to_string);
        }

        sqlx::query("UPDATE categories SET name = ?2, description = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(category.name.clone()))?;

        debug!(id = %id, name = %category.name, "Category updated");
        Ok(category)
    }

    /// Deletes a category no product names any more.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - products still carry the name
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let name: Option<String> = sqlx::query_scalar("SELECT name FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let name = name.ok_or_else(|| DbError::not_found("Category", id))?;

        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category = ?1")
            .bind(&name)
            .fetch_one(&mut *tx)
            .await?;
        if in_use > 0 {
            return Err(DbError::InUse(format!(
                "Category '{}' is used by {} product(s)",
                name, in_use
            )));
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(id = %id, name = %name, "Category deleted");
        Ok(())
    }

    /// Moves every product labelled `from_name` onto the category's
    /// current name. Returns the number of products rewritten.
    pub async fn backfill(&self, id: &str, from_name: &str) -> DbResult<u64> {
        let category = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;

        let result = sqlx::query(
            "UPDATE products SET category = ?1, updated_at = ?2 WHERE category = ?3",
        )
            .bind(&category.name)
            .bind(Utc::now())
            .bind(from_name)
            .execute(&self.pool)
            .await?;

        info!(
            id = %id,
            from = %from_name,
            to = %category.name,
            moved = result.rows_affected(),
            "Category backfill"
        );
        Ok(result.rows_affected())
    }
}
