//! Transaction wrapper with bounded retry for transient failures.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use crate::error::{AppError, is_retryable};

/// Backoff policy applied when a whole transaction is retried.
///
/// Only failures classified as retryable by [`crate::error::is_retryable`]
/// (serialization failures, deadlocks, transient transport errors) re-enter;
/// everything else surfaces immediately.
#[derive(Debug, Clone)]
pub struct TxRetryPolicy {
    /// First backoff interval.
    pub initial_interval: Duration,
    /// Upper bound for a single backoff interval.
    pub max_interval: Duration,
    /// Total elapsed budget across all attempts.
    pub max_elapsed: Duration,
}

impl Default for TxRetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed: Duration::from_secs(8),
        }
    }
}

impl TxRetryPolicy {
    /// Doubling intervals starting at `initial_interval`, capped at
    /// `max_interval`, stopping once `max_elapsed` has passed. The elapsed
    /// check runs lazily at each retry, so a cancelled caller stops
    /// retrying at its next await point.
    fn intervals(&self, started: Instant) -> impl Iterator<Item = Duration> + use<> {
        let budget = self.max_elapsed;
        ExponentialBackoff::from_millis(2)
            .factor(self.initial_interval.as_millis() as u64 / 2)
            .max_delay(self.max_interval)
            .take_while(move |_| started.elapsed() < budget)
    }
}

/// Runs `f` inside a database transaction.
///
/// Commits on success; any error (or panic unwinding through the closure)
/// drops the transaction, which rolls it back. A retryable failure re-runs
/// the whole transaction under `policy` - `f` must therefore be safe to
/// re-execute from scratch, which is why it is `Fn` and not `FnOnce`.
pub async fn in_tx<T, F>(pool: &PgPool, policy: &TxRetryPolicy, f: F) -> Result<T, AppError>
where
    T: Send,
    F: for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, Result<T, AppError>> + Send + Sync,
{
    let started = Instant::now();

    RetryIf::spawn(
        policy.intervals(started),
        || async {
            let mut tx = pool.begin().await.map_err(AppError::Database)?;
            let out = f(&mut *tx).await?;
            tx.commit().await.map_err(AppError::Database)?;
            Ok(out)
        },
        |e: &AppError| is_retryable(e),
    )
    .await
}
