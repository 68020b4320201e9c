use std::{future::Future, time::Duration};

use advisorhub_shared::{Error, Result};
use futures::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};

/// Runs `f` inside a write transaction.
///
/// Attempts failing with a retryable error (a version conflict or a busy
/// store) are rolled back and run again, up to `max_attempts`. After that the
/// caller gets [`Error::Conflict`]. Commit errors are returned as is: a commit
/// that may or may not have landed is never replayed.
pub async fn run_transaction<T, F>(pool: &SqlitePool, max_attempts: u32, mut f: F) -> Result<T>
where
    F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let mut tx = pool.begin().await?;
        let result = f(&mut *tx).await;
        let err = match result {
            Ok(value) => {
                tx.commit().await?;
                return Ok(value);
            }
            Err(err) => err,
        };

        if let Err(rollback_err) = tx.rollback().await {
            tracing::warn!(err = %rollback_err, "failed to roll back transaction");
        }

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= max_attempts {
            tracing::warn!(attempt, err = %err, "transaction retries exhausted");
            return Err(Error::Conflict);
        }

        tracing::debug!(attempt, err = %err, "retrying transaction");
        tokio::time::sleep(Duration::from_millis(5 * u64::from(attempt))).await;
    }
}

/// Retries an idempotent read while the store reports itself unavailable.
pub async fn retry_read<T, F, Fut>(max_retries: u32, backoff: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        match f().await {
            Err(Error::StoreUnavailable(reason)) if retries < max_retries => {
                retries += 1;
                tracing::warn!(retries, reason = %reason, "store unavailable, retrying read");
                tokio::time::sleep(backoff * retries).await;
            }
            other => return other,
        }
    }
}
