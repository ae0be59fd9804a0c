//! Database timeouts and the persistence error type.
//!
//! Every statement issued by the repository goes through [`with_timeout`], so
//! no request can hang on the database past its deadline.

use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for single statements (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a whole transaction (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be mapped to a domain value
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Result type for persistence operations
pub type DbResult<T> = Result<T, DbError>;

/// Execute a database future with a timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `DbResult<T>` - Result or timeout error
///
/// # Example
///
/// ```no_run
/// use vdm::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
///
/// let result = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM users WHERE tag = $1")
///         .bind("user0123")
///         .fetch_optional(pool)
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> DbResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(DbError::Database(e)),
        Err(_) => Err(DbError::Timeout(duration)),
    }
}

/// Execute a single statement with the default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> DbResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Run a whole transactional unit of work under [`DEFAULT_TRANSACTION_TIMEOUT`].
///
/// If the deadline fires, the future is dropped together with its
/// `sqlx::Transaction`, which rolls the transaction back.
pub async fn with_transaction_timeout<F, T>(future: F) -> DbResult<T>
where
    F: std::future::Future<Output = DbResult<T>>,
{
    match timeout(DEFAULT_TRANSACTION_TIMEOUT, future).await {
        Ok(result) => result,
        Err(_) => Err(DbError::Timeout(DEFAULT_TRANSACTION_TIMEOUT)),
    }
}
