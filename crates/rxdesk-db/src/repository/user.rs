//! # User Repository
//!
//! Back-office accounts. Password hashing happens in the API; this
//! repository only stores and returns the hash.

use chrono::{DateTime, Utc};
use rxdesk_core::{Role, User};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

/// A user row including the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Validated input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn create(&self, input: NewUser) -> DbResult<User> {
        debug!(email = %input.email, role = input.role.as_str(), "Creating user");

        let user = User {
            id: new_id(),
            name: input.name,
            email: input.email,
            role: input.role,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&input.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(user.email.clone()))?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let record: Option<UserRecord> = sqlx::query_as(
            "SELECT id, name, email, role, password_hash, created_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserRecord::into_user))
    }

    /// Looks an account up for login (email is stored lowercased).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        let record = sqlx::query_as(
            "SELECT id, name, email, role, password_hash, created_at FROM users WHERE email = ?1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let records: Vec<UserRecord> = sqlx::query_as(
            "SELECT id, name, email, role, password_hash, created_at FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(UserRecord::into_user).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::memory_db;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Ayesha".into(),
            email: email.into(),
            role,
            password_hash: "$argon2id$stub".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = memory_db().await;
        let users = db.users();

        let created = users.create(new_user("cashier@rx.test", Role::Cashier)).await.unwrap();
        let found = users.find_by_email("Cashier@RX.test").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Cashier);
        assert_eq!(found.password_hash, "$argon2id$stub");

        assert_eq!(users.get_by_id(&created.id).await.unwrap().unwrap().email, "cashier@rx.test");
        assert_eq!(users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let db = memory_db().await;
        let users = db.users();

        users.create(new_user("admin@rx.test", Role::Admin)).await.unwrap();
        let err = users.create(new_user("admin@rx.test", Role::Finance)).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert!(err.to_string().contains("admin@rx.test"));
    }
}
