//! Database transaction utilities
//!
//! Multi-step writes (the clear-then-set of the default template) run inside a
//! [`TransactionGuard`] so they either land together or not at all.

use imprint_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A database transaction wrapper that must be explicitly committed.
///
/// Dropping an unfinished guard rolls the transaction back (sqlx does this
/// when the inner transaction is dropped) and logs a warning.
///
/// # Example
///
/// ```ignore
/// use imprint_db::db::transaction::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), imprint_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("UPDATE templates SET is_default = FALSE").execute(tx.conn()?).await?;
///     tx.commit().await?;
///     Ok(())
/// }
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction
    pub async fn begin(pool: &'a PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection bound to this transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::Internal("Transaction was already committed or rolled back".to_string())
        })
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
