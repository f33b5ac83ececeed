//! # Sequence Repository
//!
//! Atomic, scope-keyed counters.
//!
//! ## Upsert-and-Increment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, then write (two callers can both read 41)              │
//! │     SELECT seq FROM counters WHERE name = ?   → 41                     │
//! │     UPDATE counters SET seq = 42 ...                                   │
//! │                                                                         │
//! │  ✅ CORRECT: one statement, one write lock                             │
//! │     INSERT INTO counters (name, seq) VALUES (?, 1)                     │
//! │     ON CONFLICT (name) DO UPDATE SET seq = seq + 1                     │
//! │     RETURNING seq                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Values are never reused. Outside a transaction an issued value is
//! consumed even if the caller later fails (gaps are fine, duplicates are
//! not). Inside a transaction it rolls back with it.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

const NEXT_SQL: &str = r#"
    INSERT INTO counters (name, seq) VALUES (?1, 1)
    ON CONFLICT (name) DO UPDATE SET seq = seq + 1
    RETURNING seq
"#;

#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Issues the next value of `scope`, starting at 1.
    pub async fn next(&self, scope: &str) -> DbResult<i64> {
        next_with(&self.pool, scope).await
    }

    /// Last issued value of `scope` (0 if never used).
    pub async fn current(&self, scope: &str) -> DbResult<i64> {
        let seq: Option<i64> = sqlx::query_scalar("SELECT seq FROM counters WHERE name = ?1")
            .bind(scope)
            .fetch_optional(&self.pool)
            .await?;
        Ok(seq.unwrap_or(0))
    }
}

/// [`SequenceRepository::next`] on any executor, typically `&mut *tx`.
pub async fn next_with<'e, E>(executor: E, scope: &str) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let seq: i64 = sqlx::query_scalar(NEXT_SQL)
        .bind(scope)
        .fetch_one(executor)
        .await?;
    debug!(scope = %scope, seq, "Issued sequence value");
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::memory_db;

    #[tokio::test]
    async fn test_sequences_start_at_one_and_are_scoped() {
        let db = memory_db().await;
        let seq = db.sequences();

        assert_eq!(seq.current("invoice-20251001").await.unwrap(), 0);
        assert_eq!(seq.next("invoice-20251001").await.unwrap(), 1);
        assert_eq!(seq.next("invoice-20251001").await.unwrap(), 2);
        assert_eq!(seq.next("invoice-20251002").await.unwrap(), 1);
        assert_eq!(seq.current("invoice-20251001").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_never_share_a_value() {
        let db = memory_db().await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let seq = db.sequences();
            handles.push(tokio::spawn(async move { seq.next("productId").await.unwrap() }));
        }

        let mut issued = Vec::new();
        for h in handles {
            issued.push(h.await.unwrap());
        }
        issued.sort_unstable();
        assert_eq!(issued, (1..=20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_rolled_back_transaction_releases_value() {
        let db = memory_db().await;

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(super::next_with(&mut *tx, "batchNumber").await.unwrap(), 1);
        tx.rollback().await.unwrap();

        assert_eq!(db.sequences().next("batchNumber").await.unwrap(), 1);
    }
}
