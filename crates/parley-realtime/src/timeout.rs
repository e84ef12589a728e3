//! Deadlines for dependency calls.

use std::future::Future;
use std::time::Duration;

use parley_core::error::AppError;
use parley_core::result::AppResult;

/// Run a dependency call under a deadline.
///
/// An elapsed deadline becomes an [`ErrorKind::Timeout`] error naming the
/// operation, so callers log it like any other transient failure.
///
/// [`ErrorKind::Timeout`]: parley_core::error::ErrorKind::Timeout
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::timeout(format!(
            "{operation} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
